#[cfg(test)]
mod tests {
    use crate::class_list::parse_class_list;
    use crate::color::ColorFormat;
    use crate::parse::parse_component;
    use crate::transform::{transform_source, TransformOptions};
    use crate::validate::{validate_component, ComponentIR, ElementNode};
    use crate::value::{parse_value, ArbitraryValue, FunctionCall};

    const FIXTURE: &str = include_str!("../fixtures/compile-mode/index.jsx");
    const FIXTURE_PATH: &str = "fixtures/compile-mode/index.jsx";

    fn component() -> ComponentIR {
        parse_component(FIXTURE, FIXTURE_PATH, &TransformOptions::default()).unwrap()
    }

    fn children(ir: &ComponentIR) -> Vec<&ElementNode> {
        ir.root_element().unwrap().child_elements()
    }

    #[test]
    fn test_fixture_shape() {
        let ir = component();
        assert_eq!(ir.name.as_deref(), Some("Index"));
        assert_eq!(ir.style_imports, vec!["./index.scss"]);
        assert_eq!(ir.native_components, vec!["View"]);

        let kids = children(&ir);
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].static_class(), Some("a"));
        assert!(kids[0].has_boolean_attribute("compileMode"));
        assert_eq!(kids[1].static_class(), Some("a bg-[rgba(0,0,0,0.5)]"));
        assert!(!kids[1].has_boolean_attribute("compileMode"));
    }

    #[test]
    fn test_fixture_compile_mode_root() {
        let ir = component();
        let kids = children(&ir);
        assert_eq!(ir.compile_mode_roots, vec![kids[0].span_start]);
        assert!(kids[0].in_compile_mode);
        assert!(!kids[1].in_compile_mode);
    }

    #[test]
    fn test_fixture_arbitrary_value() {
        let ir = component();
        let class = children(&ir)[1].static_class().unwrap().to_string();
        let list = parse_class_list(&class).unwrap();
        assert_eq!(list.names(), vec!["a", "bg-[rgba(0,0,0,0.5)]"]);

        let arbitrary = list.arbitrary();
        assert_eq!(arbitrary, vec![("bg", "rgba(0,0,0,0.5)")]);
        assert_eq!(
            parse_value(arbitrary[0].1).unwrap(),
            ArbitraryValue::Function(FunctionCall::new(
                "rgba",
                vec![
                    ArbitraryValue::Number(0.0),
                    ArbitraryValue::Number(0.0),
                    ArbitraryValue::Number(0.0),
                    ArbitraryValue::Number(0.5),
                ],
            ))
        );
    }

    #[test]
    fn test_fixture_validates_cleanly() {
        assert!(validate_component(&component()).is_empty());
    }

    #[test]
    fn test_fixture_without_stylesheet() {
        let output = transform_source(FIXTURE, FIXTURE_PATH, None, &TransformOptions::default()).unwrap();
        assert!(output.diagnostics.is_empty());
        assert!(output
            .code
            .contains(r#"<View className='a bg-[rgba(0,0,0,0.5)]' style="background-color:#00000080;" />"#));
        assert!(output.code.contains("<View className='a' compileMode />"));
    }

    #[test]
    fn test_fixture_rgba_output() {
        let options = TransformOptions {
            color_format: ColorFormat::Rgba,
            ..TransformOptions::default()
        };
        let output = transform_source(FIXTURE, FIXTURE_PATH, None, &options).unwrap();
        assert!(output
            .code
            .contains(r#"style="background-color:rgba(0,0,0,0.5);""#));
    }

    #[test]
    fn test_fixture_compile_mode_only_with_stylesheet() {
        let options = TransformOptions {
            compile_mode_only: true,
            ..TransformOptions::default()
        };
        let output =
            transform_source(FIXTURE, FIXTURE_PATH, Some(".a { color: red; }"), &options).unwrap();
        assert!(output
            .code
            .contains(r#"<View className='a' compileMode style="color:red;" />"#));
        assert!(output
            .code
            .contains("<View className='a bg-[rgba(0,0,0,0.5)]' />"));
        assert_eq!(output.styles.len(), 1);
    }
}
