//! Safety tests
//!
//! Sources the compiler must refuse, with the diagnostic it reports, and the
//! update laws every accepted component must obey.

#[cfg(test)]
mod tests {
    use crate::diagnostics::{
        DiagnosticKind, ERR_CONSTANT_ASSIGNMENT, ERR_INSTANCE_ESCAPE, ERR_OPTIONS,
        ERR_SCRIPT_SYNTAX, ERR_SEMANTIC, ERR_UNRESOLVED_COMPONENT, ERR_UNRESOLVED_IDENTIFIER,
        ERR_UNSUPPORTED_BLOCK, ERR_UNSUPPORTED_DECLARATION, ERR_UNSUPPORTED_DIRECTIVE,
        ERR_UNSUPPORTED_MODIFIER, ERR_UNSUPPORTED_SLOT,
    };
    use crate::mask::DirtyMask;
    use crate::{compile_component, compile_component_json, resolve_source, CompileOptions, CompileResult};

    fn compile(source: &str) -> CompileResult {
        compile_component(source, &CompileOptions::for_file("Test.zen")).unwrap()
    }

    fn rejected(source: &str, code: &str) -> CompileResult {
        let result = compile(source);
        assert!(result.code.is_none(), "{:?} compiled", source);
        assert!(
            result.diagnostics.iter().any(|d| d.code == code),
            "expected {} for {:?}, got {:?}",
            code,
            source,
            result.diagnostics
        );
        result
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unresolved_identifier() {
        let result = rejected("<p>\n  {missing}\n</p>", ERR_UNRESOLVED_IDENTIFIER);
        let diagnostic = &result.diagnostics[0];
        assert_eq!(diagnostic.message, "Unknown identifier 'missing'.");
        assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
        assert_eq!((diagnostic.line, diagnostic.column), (2, 4));
        assert!(!diagnostic.guarantee.is_empty());
    }

    #[test]
    fn test_every_problem_is_reported_in_one_pass() {
        let result = compile("<p>{one} {two}</p><Nope /><div bind:value={x}></div>");
        let codes: Vec<&str> = result.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert!(codes.contains(&ERR_UNSUPPORTED_DIRECTIVE));
        assert!(codes.contains(&ERR_UNRESOLVED_COMPONENT));
        assert_eq!(codes.iter().filter(|c| **c == ERR_UNRESOLVED_IDENTIFIER).count(), 2);
        assert!(result.code.is_none());
    }

    #[test]
    fn test_state_in_plain_function_expression() {
        rejected(
            "<script>let count = 0; const doubled = [1].map(function (v) { return v * count; });</script><p>{doubled}</p>",
            ERR_INSTANCE_ESCAPE,
        );
    }

    #[test]
    fn test_state_in_arrow_function_is_fine() {
        let result = compile("<script>let count = 0; const doubled = [1].map((v) => v * count);</script><p>{doubled}</p>");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_function_reassignment() {
        let result = rejected("<script>function f() {}\nf = () => {};</script>", ERR_CONSTANT_ASSIGNMENT);
        assert!(result.diagnostics[0].hints[0].contains("let"));
    }

    #[test]
    fn test_const_reassignment() {
        let result = compile("<script>const limit = 1; function raise() { limit = 2; }</script><p>{limit}</p>");
        assert!(result.code.is_none());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == ERR_CONSTANT_ASSIGNMENT || d.code == ERR_SEMANTIC));
    }

    #[test]
    fn test_unimported_component() {
        let result = rejected("<Missing />", ERR_UNRESOLVED_COMPONENT);
        assert_eq!(result.diagnostics[0].message, "Component <Missing> is not imported.");
        assert!(result.diagnostics[0].hints[0].contains("import Missing from \"./Missing.zen\";"));
    }

    #[test]
    fn test_non_import_binding_is_not_a_component() {
        rejected("<script>const Card = 1;</script><Card />", ERR_UNRESOLVED_COMPONENT);
    }

    #[test]
    fn test_unknown_event_modifier() {
        let result = rejected(
            "<script>function go() {}</script><button on:click|debounce={go}>x</button>",
            ERR_UNSUPPORTED_MODIFIER,
        );
        assert!(result.diagnostics[0].message.contains("debounce"));
    }

    #[test]
    fn test_conflicting_passive_modifiers() {
        rejected(
            "<script>function go() {}</script><div on:wheel|passive|nonpassive={go}></div>",
            ERR_UNSUPPORTED_MODIFIER,
        );
    }

    #[test]
    fn test_module_declaration_using_state() {
        rejected(
            "<script>let count = 0; class Store { value = count; }</script><p>{count}</p>",
            ERR_UNSUPPORTED_DECLARATION,
        );
    }

    #[test]
    fn test_directives_and_blocks() {
        rejected("<input bind:value={name} />", ERR_UNSUPPORTED_DIRECTIVE);
        rejected("<button on:click>x</button>", ERR_UNSUPPORTED_DIRECTIVE);
        rejected("{#each items as item}{item}{/each}", ERR_UNSUPPORTED_BLOCK);
    }

    #[test]
    fn test_events_on_components() {
        rejected(
            "<script>import Card from './Card.zen'; function go() {}</script><Card on:click={go} />",
            ERR_UNSUPPORTED_DIRECTIVE,
        );
    }

    #[test]
    fn test_duplicate_slot_fill() {
        rejected(
            "<script>import Card from './Card.zen';</script><Card><b slot=\"x\">1</b><i slot=\"x\">2</i></Card>",
            ERR_UNSUPPORTED_SLOT,
        );
    }

    #[test]
    fn test_script_syntax_error_points_at_script() {
        let result = rejected("<script>\nlet = ;\n</script><p>x</p>", ERR_SCRIPT_SYNTAX);
        let diagnostic = result
            .diagnostics
            .iter()
            .find(|d| d.code == ERR_SCRIPT_SYNTAX)
            .unwrap();
        assert_eq!(diagnostic.line, 2);
    }

    #[test]
    fn test_bad_options_json() {
        let result = compile_component_json("<p>x</p>", "{ not json");
        assert!(result.code.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, ERR_OPTIONS);
    }

    #[test]
    fn test_options_json_round_trip() {
        let result = compile_component_json(
            "<script>let n = 1;</script><p>{n}</p>",
            r#"{ "filePath": "src/lib/my-widget.zen" }"#,
        );
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.component_name, "MyWidget");
        assert!(result.code.unwrap().contains("export default class MyWidget extends Component {"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Update laws
    // ═══════════════════════════════════════════════════════════════════════════════

    const DASHBOARD: &str = r#"<script>
  import Chart from "./Chart.zen";
  export let title = "Dashboard";
  let items: number[] = [];
  let filter = "";
  let expanded = false;
  const visible = items.filter((i) => String(i).includes(filter));
  $: console.log(visible.length);
  function add() { items = [...items, items.length]; }
</script>
<h1 class:active={expanded}>{title}</h1>
<input value={filter} on:input={(e) => filter = e.target.value} />
{#if expanded}
  <Chart data={visible}><span>{title}</span></Chart>
{:else}
  <button on:click={() => expanded = true}>Show {visible.length}</button>
{/if}
<button on:click={add}>Add</button>
"#;

    #[test]
    fn test_flows_fire_exactly_on_their_reads() {
        let source = DASHBOARD.replace(" class:active={expanded}", "");
        let (component, _, diagnostics) =
            resolve_source(&source, &CompileOptions::for_file("Dashboard.zen"));
        assert!(
            diagnostics.is_empty(),
            "{:?}",
            diagnostics.iter().collect::<Vec<_>>()
        );
        let component = component.unwrap();
        assert!(component.width > 0);

        for (id, variable) in component.variables.iter().enumerate() {
            let Some(bit) = variable.bit else {
                continue;
            };
            let dirty = DirtyMask::bit(bit);
            for flow in component.flows() {
                let expected = flow.reads.contains(&id);
                assert_eq!(
                    flow.fires(&dirty),
                    expected,
                    "flow {:?} with {} dirty",
                    flow.action,
                    variable.name
                );
            }
        }
    }

    #[test]
    fn test_bits_are_dense_and_ordered() {
        let source = DASHBOARD.replace(" class:active={expanded}", "");
        let (component, _, _) = resolve_source(&source, &CompileOptions::for_file("Dashboard.zen"));
        let component = component.unwrap();
        let bits: Vec<u32> = component.variables.iter().filter_map(|v| v.bit).collect();
        let expected: Vec<u32> = (0..component.width).collect();
        assert_eq!(bits, expected);
        // Functions and derived values never own a bit.
        assert!(component
            .variables
            .iter()
            .filter(|v| v.is_function() || v.name == "visible")
            .all(|v| v.bit.is_none()));
    }

    #[test]
    fn test_unknown_directive_in_dashboard() {
        rejected(DASHBOARD, ERR_UNSUPPORTED_DIRECTIVE);
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = DASHBOARD.replace(" class:active={expanded}", "");
        let first = compile_component(&source, &CompileOptions::for_file("Dashboard.zen")).unwrap();
        let second = compile_component(&source, &CompileOptions::for_file("Dashboard.zen")).unwrap();
        assert!(first.code.is_some());
        assert_eq!(first.code, second.code);
        assert_eq!(first.bits, second.bits);
    }
}
