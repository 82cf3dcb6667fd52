//! Component compilation tests
//!
//! End-to-end scenarios: source text in, generated module and bit table out.
//! Assertions look at the model and at substrings of the emitted code.

#[cfg(test)]
mod tests {
    use crate::model::{Action, ReactiveNode, VarRole};
    use crate::{compile_component, resolve_source, CompileOptions, CompileResult};

    fn compile_as(file: &str, source: &str) -> CompileResult {
        let result = compile_component(source, &CompileOptions::for_file(file)).unwrap();
        assert!(
            result.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            result.diagnostics
        );
        result
    }

    fn code(file: &str, source: &str) -> String {
        compile_as(file, source).code.unwrap()
    }

    const COUNTER: &str = r#"<script>
  let count = 0;
  function increment() { count += 1; }
</script>
<button on:click={increment}>Count: {count}</button>
"#;

    // ═══════════════════════════════════════════════════════════════════════════════
    // Counter
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_counter_text_node() {
        let result = compile_as("Counter.zen", COUNTER);
        assert_eq!(result.component_name, "Counter");
        assert_eq!(result.bits.get("count"), Some(&0));
        assert_eq!(result.bits.len(), 1);

        let code = result.code.unwrap();
        assert!(code.starts_with("import { Component, listen } from \"@zenithbuild/reactive\";\n"));
        assert!(code.contains("import type { Slots, Subscription } from \"@zenithbuild/reactive\";"));
        assert!(code.contains("export default class Counter extends Component {"));
        assert!(code.contains("  v0!: number;\n"));
        assert!(code.contains("  n0!: HTMLButtonElement;\n"));

        // The increment wraps and flags count's bit.
        assert!(code.contains(
            "  f0 = () => { (() => { const __v = (this.v0 += 1); this.invalidate(0x1); return __v; })(); };\n"
        ));

        // create yields the initial text, update re-runs it under count's bit only.
        assert!(code.contains("    this.v0 = (0);\n"));
        assert!(code.contains("    this.n1 = document.createTextNode(\"Count: \");\n"));
        assert!(code.contains("    this.n2 = document.createTextNode(\"\");\n"));
        assert!(code.contains("    this.n2.data = String(this.v0);\n"));
        assert!(code.contains(
            "    if ((dirty & 0x1) !== 0) {\n      this.n2.data = String(this.v0);\n    }\n"
        ));
    }

    #[test]
    fn test_counter_listener_is_registered_once() {
        let code = code("Counter.zen", COUNTER);
        assert!(code.contains("    this.m0 = listen(this.n0, \"click\", this.f0);\n"));
        // A handler that reads nothing reactive is one-off: not in update.
        let update = &code[code.find("  update(").unwrap()..];
        let update = &update[..update.find("\n  }\n").unwrap()];
        assert!(!update.contains("listen("));
        assert!(code.contains("    this.m0?.dispose();\n    this.n0.remove();\n"));
    }

    #[test]
    fn test_counter_mount_order() {
        let code = code("Counter.zen", COUNTER);
        let mount = &code[code.find("  mountInternal(target: Node, anchor: Node | null): void {").unwrap()..];
        let append = mount.find("this.n0.appendChild(this.n1);").unwrap();
        let append_text = mount.find("this.n0.appendChild(this.n2);").unwrap();
        let insert = mount.find("target.insertBefore(this.n0, anchor);").unwrap();
        assert!(append < append_text);
        assert!(append_text < insert);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Conditionals
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_if_else_swaps_through_selector() {
        let source = "<script>let count = 0;</script>\n{#if count >= 5}<p>big</p>{:else}<p>small {count}</p>{/if}";
        let code = code("Counter.zen", source);

        assert!(code.contains(
            "    this.n0 = new IfBlock(() => (this.v0 >= 5) ? 0 : 1, [() => new Counter$If0$Branch0(this)], () => new Counter$If0$Else(this));\n"
        ));
        assert!(code.contains("    if ((dirty & 0x1) !== 0) {\n      this.n0.select();\n    }\n"));
        assert!(code.contains("    this.n0.update(dirty);\n"));
        assert!(code.contains("    this.n0.destroy();\n"));

        assert!(code.contains("class Counter$If0$Branch0 extends Fragment {"));
        assert!(code.contains("class Counter$If0$Else extends Fragment {"));
        // Fragment code reaches component state through its parent.
        assert!(code.contains("      this.n2.data = String(this.parent.v0);\n"));
        assert!(code.contains("  constructor(parent: Counter) {\n    super();\n    this.parent = parent;\n  }\n"));
    }

    #[test]
    fn test_else_if_chain_keeps_source_order() {
        let source = "<script>let n = 0;</script>{#if n > 10}<b>a</b>{:else if n > 5}<b>b</b>{:else}<b>c</b>{/if}";
        let code = code("Ladder.zen", source);
        assert!(code.contains("() => (this.v0 > 10) ? 0 : (this.v0 > 5) ? 1 : 2"));
        assert!(code.contains(
            "[() => new Ladder$If0$Branch0(this), () => new Ladder$If0$Branch1(this)], () => new Ladder$If0$Else(this)"
        ));
    }

    #[test]
    fn test_nested_if_builds_from_parent_fragment() {
        let source = "<script>let a = true; let b = true;</script>{#if a}{#if b}<i>x</i>{/if}{/if}";
        let code = code("Nest.zen", source);
        assert!(code.contains("class Nest$If0$Branch0 extends Fragment {"));
        assert!(code.contains("class Nest$If1$Branch0 extends Fragment {"));
        assert!(code.contains("new IfBlock(() => (this.parent.v1) ? 0 : 1, [() => new Nest$If1$Branch0(this.parent)], null);"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Props
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_required_property_fails_at_construction() {
        let source = "<script>export let title: string;</script><h1>{title}</h1>";
        let result = compile_as("Card.zen", source);
        assert_eq!(result.props, vec!["title".to_string()]);
        let code = result.code.unwrap();
        assert!(code.contains("export interface CardProps {\n  title?: Wrapped<string>;\n}\n"));
        assert!(code.contains("  private constructor(slots: Slots, $p0?: Wrapped<string>) {\n"));
        assert!(code.contains(
            "    this.v0 = $p0 !== undefined ? $p0.value : requiredProperty(\"Card\", \"title\");\n"
        ));
        assert!(code.contains("    const component = new Card(slots, props.title);\n"));
        assert!(code.contains("requiredProperty } from"));
    }

    #[test]
    fn test_defaulted_property() {
        let source = "<script>export let step = 1;</script><p>{step}</p>";
        let code = code("Stepper.zen", source);
        assert!(code.contains("    this.v0 = $p0 !== undefined ? $p0.value : (1);\n"));
        assert!(!code.contains("requiredProperty"));
    }

    #[test]
    fn test_setter_compares_its_own_slot() {
        let source = "<script>export let first = 'a'; export let second = 'b';</script><p>{first}{second}</p>";
        let code = code("Pair.zen", source);
        assert!(code.contains(
            "  set first(value: string) {\n    if (this.v0 === value) return;\n    this.v0 = value;\n    this.invalidate(0x1);\n  }\n"
        ));
        assert!(code.contains(
            "  set second(value: string) {\n    if (this.v1 === value) return;\n    this.v1 = value;\n    this.invalidate(0x2);\n  }\n"
        ));
        assert!(code.contains("  get second(): string {\n    return this.v1;\n  }\n"));
    }

    #[test]
    fn test_read_only_property_has_no_setter() {
        let source = "<script>export const label = 'x';</script><p>{label}</p>";
        let code = code("Label.zen", source);
        assert!(code.contains("  get label(): string {"));
        assert!(!code.contains("  set label("));
    }

    #[test]
    fn test_unread_property_setter_does_not_invalidate() {
        let source = "<script>export let hidden = 0;</script><p>static</p>";
        let result = compile_as("Hidden.zen", source);
        assert!(result.bits.is_empty());
        let code = result.code.unwrap();
        let setter = &code[code.find("  set hidden(").unwrap()..];
        let setter = &setter[..setter.find("\n  }\n").unwrap()];
        assert!(!setter.contains("invalidate"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Script semantics
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_derived_constant_recomputes_on_its_inputs() {
        let source = "<script>let count = 1; const doubled = count * 2;</script><p>{doubled}</p>";
        let (component, _, diagnostics) =
            resolve_source(source, &CompileOptions::for_file("Double.zen"));
        assert!(diagnostics.is_empty());
        let component = component.unwrap();
        let doubled = component.variable_named("doubled").unwrap();
        assert_eq!(doubled.role, VarRole::DerivedReactive);
        assert_eq!(doubled.bit, None);
        assert_eq!(component.variable_named("count").unwrap().bit, Some(0));

        let code = code("Double.zen", source);
        assert!(code.contains("    if ((dirty & 0x1) !== 0) {\n      this.v1 = (this.v0 * 2);\n    }\n"));
        assert!(code.contains("    if ((dirty & 0x1) !== 0) {\n      this.n1.data = String(this.v1);\n    }\n"));
    }

    #[test]
    fn test_reactive_statement_depends_on_reads_not_writes() {
        let source = "<script>let a = 1; let b = 0; $: b = a + 1;</script><p>{b}</p>";
        let result = compile_as("Plus.zen", source);
        assert_eq!(result.bits.get("a"), Some(&0));
        assert_eq!(result.bits.get("b"), Some(&1));
        let code = result.code.unwrap();
        assert!(code.contains(
            "    if ((dirty & 0x1) !== 0) {\n      (() => { const __v = (this.v1 = this.v0 + 1); this.invalidate(0x2); return __v; })();\n    }\n"
        ));
    }

    #[test]
    fn test_dead_bits_are_eliminated() {
        let source = "<script>let shown = 0; let unused = 0; let alsoUnused = 1; function bump() { unused++; }</script><p>{shown}</p>";
        let result = compile_as("Dead.zen", source);
        assert_eq!(result.bits.len(), 1);
        assert_eq!(result.bits.get("shown"), Some(&0));
        // No bit, so the write is left bare.
        assert!(result.code.unwrap().contains("  f0 = () => { this.v1++; };\n"));
    }

    #[test]
    fn test_constructor_writes_are_not_wrapped() {
        let source = "<script>let count = 0; count = 5; setTimeout(() => count++, 10);</script><p>{count}</p>";
        let code = code("Init.zen", source);
        assert!(code.contains("    this.v0 = 5;\n"));
        assert!(code.contains(
            "    setTimeout(() => (() => { const __v = (this.v0++); this.invalidate(0x1); return __v; })(), 10);\n"
        ));
    }

    #[test]
    fn test_member_mutation_makes_a_const_reactive() {
        let source = "<script>const user = { name: 'a' };</script><button on:click={() => user.name = 'b'}>{user.name}</button>";
        let result = compile_as("User.zen", source);
        assert_eq!(result.bits.get("user"), Some(&0));
        assert!(result.code.unwrap().contains(
            "() => (() => { const __v = (this.v0.name = 'b'); this.invalidate(0x1); return __v; })()"
        ));
    }

    #[test]
    fn test_async_function_field() {
        let source = "<script>let data = null; async function load(url: string) { data = await fetch(url); }</script><p>{data}</p>";
        let code = code("Loader.zen", source);
        assert!(code.contains("  f0 = async (url: string) => { (() => { const __v = (this.v0 = await fetch(url)); this.invalidate(0x1); return __v; })(); };\n"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Sub-components and slots
    // ═══════════════════════════════════════════════════════════════════════════════

    const PARENT: &str = r#"<script>
  import Card from "./Card.zen";
  let title = "hi";
</script>
<Card heading={title} compact><p>body {title}</p><span slot="footer">foot</span></Card>
"#;

    #[test]
    fn test_sub_component_props_and_slots() {
        let code = code("Page.zen", PARENT);
        assert!(code.contains("import Card from \"./Card.js\";\n"));
        assert!(code.contains("    this.m0 = new Page$Slot0$default(this);\n    this.m0.create();\n"));
        assert!(code.contains("    this.m1 = new Page$Slot1$footer(this);\n    this.m1.create();\n"));
        assert!(code.contains(
            "    this.n0 = Card.create({ heading: { value: (this.v0) }, compact: { value: true } }, { default: this.m0, footer: this.m1 });\n"
        ));
        assert!(code.contains("    if ((dirty & 0x1) !== 0) {\n      this.n0.heading = (this.v0);\n    }\n"));
        assert!(code.contains("    this.m0.update(dirty);\n    this.m1.update(dirty);\n"));
        assert!(code.contains("    this.n0.remove();\n    this.m0.destroy();\n    this.m1.destroy();\n"));
        assert!(code.contains("    this.n0.mountInternal(target, anchor);\n"));
    }

    #[test]
    fn test_property_flow_does_not_run_at_create() {
        let code = code("Page.zen", PARENT);
        let create = &code[code.find("  createInternal(): void {").unwrap()..];
        let create = &create[..create.find("\n  }\n").unwrap()];
        assert!(!create.contains(".heading ="));
    }

    #[test]
    fn test_slot_content_keeps_parent_scope() {
        let code = code("Page.zen", PARENT);
        let slot = &code[code.find("class Page$Slot0$default extends Fragment {").unwrap()..];
        assert!(slot.contains("this.n2.data = String(this.parent.v0);"));
        let footer = &code[code.find("class Page$Slot1$footer extends Fragment {").unwrap()..];
        let footer = &footer[..footer.find("\n}\n").unwrap()];
        assert!(footer.contains("document.createElement(\"span\");"));
        assert!(!footer.contains("\"slot\""));
    }

    #[test]
    fn test_static_component_props_are_not_flows() {
        let source = "<script>import Badge from './Badge.zen';</script><Badge label=\"new\" data-id=\"7\" />";
        let (component, _, _) = resolve_source(source, &CompileOptions::for_file("List.zen"));
        let component = component.unwrap();
        assert!(component.root.flows.is_empty());
        let code = code("List.zen", source);
        assert!(code.contains(
            "Badge.create({ label: { value: \"new\" }, \"data-id\": { value: \"7\" } }, {});"
        ));
    }

    #[test]
    fn test_slot_outlets_and_fallbacks() {
        let source = "<div><slot>nothing here</slot></div><slot name=\"footer\" />";
        let code = code("Card.zen", source);
        assert!(code.contains("    this.m0 = this.slot(\"default\");\n"));
        assert!(code.contains(
            "    if (this.m0 === undefined) { this.m1 = new Card$Outlet0$Fallback(this); this.m1.create(); }\n"
        ));
        assert!(code.contains("    this.m2 = this.slot(\"footer\");\n"));
        assert!(code.contains("    (this.m0 ?? this.m1)?.mount(this.n0, null);\n"));
        assert!(code.contains("    this.m2?.mount(target, anchor);\n"));
        assert!(code.contains("    this.m1?.update(dirty);\n"));
        assert!(code.contains("    this.m1?.destroy();\n"));
        assert!(code.contains("  m0?: Fragment;\n  m1?: Card$Outlet0$Fallback;\n"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Attributes, events, output options
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_attributes_static_dynamic_and_interpolated() {
        let source = "<script>let kind = 'a'; let n = 1;</script><div id=\"box\" class={kind} title=\"item {n} of 3\"></div>";
        let code = code("Box.zen", source);
        assert!(code.contains("    attr(this.n0, \"id\", \"box\");\n"));
        assert!(code.contains("    attr(this.n0, \"class\", (this.v0));\n"));
        assert!(code.contains("    attr(this.n0, \"title\", \"item \" + String(this.v1) + \" of 3\");\n"));
        assert!(code.contains("    if ((dirty & 0x2) !== 0) {\n      attr(this.n0, \"title\""));
        // Static attributes are one-off.
        assert_eq!(code.matches("attr(this.n0, \"id\"").count(), 1);
    }

    #[test]
    fn test_event_modifiers() {
        let source = "<script>function go() {}</script><form on:submit|preventDefault|once={go}></form><div on:scroll|passive={go}></div>";
        let code = code("Form.zen", source);
        assert!(code.contains(
            "listen(this.n0, \"submit\", ((handler) => (event: Event) => { event.preventDefault(); handler(event); })(this.f0), { once: true });"
        ));
        assert!(code.contains("listen(this.n1, \"scroll\", this.f0, { passive: true });"));
    }

    #[test]
    fn test_repeated_modifiers_apply_once() {
        let source = "<script>function go() {}</script><a on:click|once|once|preventDefault|preventDefault={go}>x</a>";
        let code = code("Link.zen", source);
        assert!(code.contains(
            "listen(this.n0, \"click\", ((handler) => (event: Event) => { event.preventDefault(); handler(event); })(this.f0), { once: true });"
        ));
        assert_eq!(code.matches("event.preventDefault();").count(), 1);
    }

    #[test]
    fn test_handler_reading_state_is_re_registered() {
        let source = "<script>let mode = 0; const handlers = [() => {}, () => {}];</script><button on:click={handlers[mode]}>x</button>";
        let (component, _, diagnostics) =
            resolve_source(source, &CompileOptions::for_file("Mode.zen"));
        assert!(diagnostics.is_empty());
        let component = component.unwrap();
        let listen = component
            .root
            .flows
            .iter()
            .find(|f| matches!(f.action, Action::Listen { .. }))
            .unwrap();
        assert!(!listen.is_one_off());
        let code = code("Mode.zen", source);
        assert!(code.contains(
            "    if ((dirty & 0x1) !== 0) {\n      this.m0?.dispose();\n      this.m0 = listen(this.n0, \"click\", this.v1[this.v0]);\n    }\n"
        ));
    }

    #[test]
    fn test_svg_elements_use_the_svg_namespace() {
        let source = "<svg viewBox=\"0 0 10 10\"><circle r=\"4\" /></svg>";
        let code = code("Icon.zen", source);
        assert!(code.contains("document.createElementNS(\"http://www.w3.org/2000/svg\", \"svg\");"));
        assert!(code.contains("document.createElementNS(\"http://www.w3.org/2000/svg\", \"circle\");"));
        assert!(code.contains("attr(this.n0, \"viewBox\", \"0 0 10 10\");"));
        assert!(code.contains("  n0!: SVGSVGElement;\n"));
    }

    #[test]
    fn test_wide_masks_switch_to_bigint() {
        let mut script = String::from("<script>");
        let mut markup = String::from("<p>");
        for i in 0..32 {
            script.push_str(&format!("let a{} = {};", i, i));
            markup.push_str(&format!("{{a{}}}", i));
        }
        let source = format!("{}</script>{}</p>", script, markup);
        let result = compile_as("Wide.zen", &source);
        assert_eq!(result.bits.len(), 32);
        let code = result.code.unwrap();
        assert!(code.contains("  update(dirty: bigint): void {"));
        assert!(code.contains("if ((dirty & 0x80000000n) !== 0n) {"));
        assert!(code.contains("if ((dirty & 0x1n) !== 0n) {"));
    }

    #[test]
    fn test_emit_types_off() {
        let source = "<script>export let step = 1;</script><p>{step}</p>";
        let options = CompileOptions {
            emit_types: false,
            ..CompileOptions::for_file("Stepper.zen")
        };
        let code = compile_component(source, &options).unwrap().code.unwrap();
        assert!(!code.contains("interface"));
        assert!(!code.contains("import type"));
        assert!(code.contains("  v0;\n"));
        assert!(code.contains("  constructor(slots, $p0) {\n"));
        assert!(code.contains("  static create(props = {}, slots = {}) {\n"));
        assert!(code.contains("  update(dirty) {\n"));
    }

    #[test]
    fn test_styles_and_hoisted_declarations() {
        let source = "<script>interface Item { id: number }\nlet items: Item[] = [];</script><p>{items.length}</p><style>p { color: red; }</style>";
        let result = compile_as("Items.zen", source);
        assert_eq!(result.styles, vec!["p { color: red; }".to_string()]);
        let code = result.code.unwrap();
        assert!(code.contains("interface Item { id: number }\n"));
        assert!(code.contains("  v0!: Item[];\n"));
    }

    #[test]
    fn test_model_node_kinds() {
        let source = "<script>import X from './X.zen'; let on = true;</script><div>text {on}<X />{#if on}<b>b</b>{/if}<slot /></div>";
        let (component, _, diagnostics) = resolve_source(source, &CompileOptions::for_file("Kinds.zen"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.iter().collect::<Vec<_>>());
        let component = component.unwrap();
        let kinds: Vec<&str> = component
            .root
            .nodes
            .iter()
            .map(|n| match n {
                ReactiveNode::Element { .. } => "element",
                ReactiveNode::ReactiveText => "reactive-text",
                ReactiveNode::ConstantText { .. } => "text",
                ReactiveNode::SubComponent { .. } => "component",
                ReactiveNode::ReactiveIf { .. } => "if",
                ReactiveNode::SlotOutlet { .. } => "slot",
            })
            .collect();
        assert_eq!(kinds, vec!["element", "text", "reactive-text", "component", "if", "slot"]);
        assert_eq!(component.root.roots, vec![0]);
    }
}
