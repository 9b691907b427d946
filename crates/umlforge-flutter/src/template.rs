/// Replace every `{{key}}` in `template` with its value in a single scan, so
/// text inserted from a value is never itself treated as a placeholder.
/// Unknown placeholders are left in place so a missing binding shows up in the output.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        assert_eq!(
            render("class {{Class}} { {{Class}}(); {{missing}} }", &[("Class", "Pago")]),
            "class Pago { Pago(); {{missing}} }"
        );
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        assert_eq!(
            render("{{a}} / {{b}}", &[("a", "{{b}}"), ("b", "x")]),
            "{{b}} / x"
        );
    }

    #[test]
    fn unterminated_braces_are_kept() {
        assert_eq!(render("Map<{{K}}, {{", &[("K", "int")]), "Map<int, {{");
    }
}
