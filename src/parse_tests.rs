#[cfg(test)]
mod tests {
    use crate::parse::{is_component_tag, parse_component};
    use crate::transform::TransformOptions;
    use crate::validate::{
        AttributeValue, ComponentIR, ElementNode, RenderKind, TemplateNode, ERR_NO_DEFAULT_EXPORT,
        ERR_NO_RENDER_ROOT, ERR_PARSE,
    };

    fn parse(source: &str) -> ComponentIR {
        parse_component(source, "page/index.jsx", &TransformOptions::default()).unwrap()
    }

    fn root(component: &ComponentIR) -> &ElementNode {
        component.root_element().expect("render root")
    }

    fn tags(element: &ElementNode) -> Vec<&str> {
        element.child_elements().iter().map(|e| e.tag.as_str()).collect()
    }

    #[test]
    fn test_import_extraction() {
        let ir = parse(
            r#"
            import { View, Text as T } from '@tarojs/components'
            import Taro from '@tarojs/taro'
            import './index.scss'
            import styles from './card.module.css'
            import 'taro-ui/dist/style/index.scss'
            import helper from './util'
            export default function Index() { return <View /> }
        "#,
        );
        assert_eq!(ir.style_imports, vec!["./index.scss", "./card.module.css"]);
        assert_eq!(ir.native_components, vec!["View", "T"]);
    }

    #[test]
    fn test_default_export_forms() {
        let named = parse("export default function Index() { return <View /> }");
        assert_eq!(named.render_kind, RenderKind::Function);
        assert_eq!(named.name.as_deref(), Some("Index"));

        let anonymous = parse("export default function () { return (<View />) }");
        assert_eq!(anonymous.name, None);
        assert_eq!(root(&anonymous).tag, "View");

        let arrow = parse("export default () => (\n  <View />\n)");
        assert_eq!(arrow.render_kind, RenderKind::Arrow);

        let by_name = parse("const Page = () => { return <Text /> }\nexport default Page");
        assert_eq!(by_name.render_kind, RenderKind::Arrow);
        assert_eq!(root(&by_name).tag, "Text");

        let class = parse(
            r#"
            class Page extends Component {
              render() { return <View className='page' /> }
            }
            export default Page
        "#,
        );
        assert_eq!(class.render_kind, RenderKind::ClassRender);
        assert_eq!(class.name.as_deref(), Some("Page"));
    }

    #[test]
    fn test_missing_default_export() {
        let err = parse_component(
            "export function Index() { return <View /> }",
            "a.jsx",
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_NO_DEFAULT_EXPORT);
        assert_eq!(err.file, "a.jsx");
    }

    #[test]
    fn test_render_without_jsx() {
        let err = parse_component(
            "export default function Index() {\n  return null\n}",
            "a.jsx",
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_NO_RENDER_ROOT);
        assert_eq!(err.line, 2);
        assert_eq!(err.context.as_deref(), Some("null"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_component(
            "export default () => (\n  <View>\n    <Text>\n  </View>\n)",
            "broken.jsx",
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
        assert_eq!(err.file, "broken.jsx");
        assert!(err.line >= 1);
    }

    #[test]
    fn test_class_helper_expansion() {
        let ir = parse(
            r#"
            export default class Page extends Component {
              renderHeader() {
                return <Text className='title'>Hello</Text>
              }
              render() {
                return (
                  <View className='page'>
                    {this.renderHeader()}
                  </View>
                )
              }
            }
        "#,
        );
        let page = root(&ir);
        match &page.children[0] {
            TemplateNode::Fragment(frag) => assert_eq!(frag.source.as_deref(), Some("renderHeader")),
            other => panic!("expected fragment, got {:?}", other),
        }
        let header = page.child_elements()[0];
        assert_eq!(header.tag, "Text");
        assert_eq!(header.static_class(), Some("title"));
        assert!(matches!(&header.children[0], TemplateNode::Text(t) if t.value == "Hello"));
    }

    #[test]
    fn test_function_helper_and_local_component() {
        let ir = parse(
            r#"
            function renderItem() {
              return <Image className='icon' />
            }
            const Card = ({ title }) => <View className='card'>{title}</View>
            export default function Index() {
              return (
                <View>
                  {renderItem()}
                  <Card title='x' />
                </View>
              )
            }
        "#,
        );
        let page = root(&ir);
        assert_eq!(tags(page), vec!["Image", "View"]);
        assert_eq!(page.child_elements()[1].static_class(), Some("card"));
    }

    #[test]
    fn test_native_components_are_not_expanded() {
        let ir = parse(
            r#"
            import { View } from '@tarojs/components'
            function View2() { return <Text /> }
            export default () => <View><View2 /></View>
        "#,
        );
        let page = root(&ir);
        assert_eq!(page.tag, "View");
        assert_eq!(tags(page), vec!["Text"]);
    }

    #[test]
    fn test_recursive_component_is_expanded_once() {
        let ir = parse(
            r#"
            function Tree() {
              return <View className='node'><Tree /></View>
            }
            export default () => <Tree />
        "#,
        );
        let node = root(&ir);
        assert_eq!(node.static_class(), Some("node"));
        assert_eq!(tags(node), vec!["Tree"]);
        assert!(node.child_elements()[0].is_component);
    }

    #[test]
    fn test_conditionals_and_map() {
        let ir = parse(
            r#"
            export default function List({ items, show }) {
              return (
                <View>
                  {show && <Text>on</Text>}
                  {show ? <Image /> : <Button />}
                  {items.map(item => (<View key={item.id} className='row' />))}
                  {items.length}
                  {/* comment */}
                </View>
              )
            }
        "#,
        );
        let list = root(&ir);
        assert_eq!(tags(list), vec!["Text", "Image", "Button", "View"]);
        match list.children.last() {
            Some(TemplateNode::Expression(e)) => assert_eq!(e.code, "items.length"),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_kinds() {
        let ir = parse(
            "export default () => <View className={'x'} id={`y`} onClick={handle} hidden data-a=\"1\" {...rest} />",
        );
        let view = root(&ir);
        assert_eq!(view.static_class(), Some("x"));
        assert_eq!(view.attribute("id").unwrap().value, AttributeValue::Static("y".into()));
        assert_eq!(
            view.attribute("onClick").unwrap().value,
            AttributeValue::Dynamic("handle".into())
        );
        assert!(view.has_boolean_attribute("hidden"));
        assert_eq!(view.attribute("data-a").unwrap().value, AttributeValue::Static("1".into()));
        assert_eq!(view.attribute("...").unwrap().value, AttributeValue::Dynamic("rest".into()));
    }

    #[test]
    fn test_compile_mode_subtree() {
        let ir = parse(
            r#"
            export default () => (
              <View>
                <View compileMode>
                  <Text className='x' />
                </View>
                <Text />
              </View>
            )
        "#,
        );
        let page = root(&ir);
        let children = page.child_elements();
        assert!(!page.in_compile_mode);
        assert!(children[0].in_compile_mode);
        assert!(children[0].child_elements()[0].in_compile_mode);
        assert!(!children[1].in_compile_mode);
        assert_eq!(ir.compile_mode_roots, vec![children[0].span_start]);
    }

    #[test]
    fn test_compile_mode_with_value_is_not_a_root() {
        let ir = parse("export default () => <View compileMode={false}><Text /></View>");
        assert!(ir.compile_mode_roots.is_empty());
        assert!(!root(&ir).in_compile_mode);
    }

    #[test]
    fn test_locations() {
        let ir = parse("export default () => (\n  <View>\n    <Text className='t' />\n  </View>\n)");
        let text = root(&ir).child_elements()[0];
        assert_eq!((text.location.line, text.location.column), (3, 5));
        let class = text.class_attribute().unwrap();
        assert_eq!((class.location.line, class.location.column), (3, 11));
    }

    #[test]
    fn test_is_component_tag() {
        assert!(is_component_tag("View"));
        assert!(is_component_tag("Foo.Bar"));
        assert!(!is_component_tag("view"));
        assert!(!is_component_tag(""));
    }
}
