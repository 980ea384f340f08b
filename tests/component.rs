//! End-to-end component tests against the in-memory host.
//!
//! Each test defines a component type, creates an instance on a
//! `MemoryHost`, forwards mount signals, and reaches microtask checkpoints
//! with `run_microtasks()`.
//!
//! Run with: cargo test --test component

use std::cell::Cell;
use std::rc::Rc;

use spark_elements::{
    Attribute, AttributeSpec, AttributeStore, Cleanup, ComponentConfig, ComponentError,
    ComponentEvent, Custom, Emission, Host, MemoryHost, MemoryNode, MethodsApi, NumberList,
    PropertyValue, Text, format_number, reset_definitions, reset_scheduler, run_microtasks,
};

fn setup(tag: &str) -> Rc<MemoryHost> {
    reset_definitions();
    reset_scheduler();
    Rc::new(MemoryHost::new(tag))
}

fn span(text: &str) -> MemoryNode {
    let node = MemoryNode::element("span");
    node.set_text_content(text);
    node
}

// =============================================================================
// Attribute changes drive batched re-renders
// =============================================================================

struct FormMethods {
    foo: Attribute<Text>,
    bar: Attribute<NumberList>,
}

impl FormMethods {
    fn do_thing(&self, foo: &str, bar: Vec<f64>) -> bool {
        self.foo.set(foo.to_string());
        self.bar.set(bar);
        true
    }
}

/// Renders foo, bar and user-name; counts renders in the context.
fn form_template(api: &MethodsApi<MemoryHost, Cell<usize>>) -> MemoryNode {
    api.context().set(api.context().get() + 1);

    let foo = api.attribute::<Text>("foo").unwrap().get();
    let bar = api.attribute::<NumberList>("bar").unwrap().get().map(|values| {
        values
            .iter()
            .map(|n| format_number(*n))
            .collect::<Vec<_>>()
            .join(", ")
    });
    let user = api.attribute::<Text>("user-name").unwrap().get();

    let div = MemoryNode::element("div");
    for text in [foo, bar, user] {
        div.append_child(&span(text.as_deref().unwrap_or("not set")));
    }
    div
}

fn form_html(attrs: &str, foo: &str, bar: &str, user: &str) -> String {
    format!(
        "<custom-elem-test1{attrs}><div class=\"spark-content\"><div>\
         <span>{foo}</span><span>{bar}</span><span>{user}</span>\
         </div></div></custom-elem-test1>"
    )
}

#[test]
fn test_attribute_change_rerenders() {
    let host = setup("custom-elem-test1");

    let definition = ComponentConfig::<MemoryHost, Cell<usize>, ()>::new("custom-elem-test1", || {
        Cell::new(0)
    })
    .attribute("foo", AttributeSpec::Text)
    .attribute("bar", AttributeSpec::NumberList)
    .attribute("user-name", AttributeSpec::Text)
    .methods(|api| FormMethods {
        foo: api.attribute("foo").unwrap(),
        bar: api.attribute("bar").unwrap(),
    })
    .connect(|api| {
        api.render(&form_template(api));

        let rerender = (**api).clone();
        let foo = api.attribute::<Text>("foo").unwrap();
        let bar = api.attribute::<NumberList>("bar").unwrap();
        let user = api.attribute::<Text>("user-name").unwrap();
        api.on_change(&[&foo, &bar, &user], move || {
            rerender.render(&form_template(&rerender));
        });
        None
    })
    .define()
    .unwrap();

    assert_eq!(definition.observed_attributes(), vec!["foo", "bar", "user-name"]);

    let element = definition.create(host.clone());
    assert!(element.connected());
    assert_eq!(host.to_html(), form_html("", "not set", "not set", "not set"));
    assert_eq!(element.context().get(), 1);

    element.attribute::<Text>("foo").unwrap().set("foo".into());
    run_microtasks();
    assert_eq!(host.to_html(), form_html(" foo=\"foo\"", "foo", "not set", "not set"));

    element.attribute::<NumberList>("bar").unwrap().set(vec![4.0, 20.0]);
    run_microtasks();
    assert_eq!(
        host.to_html(),
        form_html(" foo=\"foo\" bar=\"4,20\"", "foo", "4, 20", "not set")
    );

    element.attribute::<Text>("user-name").unwrap().set("John Doe".into());
    run_microtasks();
    let attrs = " foo=\"foo\" bar=\"4,20\" user-name=\"John Doe\"";
    assert_eq!(host.to_html(), form_html(attrs, "foo", "4, 20", "John Doe"));

    // External writes go through the same path.
    host.set_attribute("foo", "BOOBARBAZ");
    run_microtasks();
    host.set_attribute("bar", "6,9,6,9");
    run_microtasks();
    host.set_attribute("user-name", "Billy Smith");
    run_microtasks();
    let attrs = " foo=\"BOOBARBAZ\" bar=\"6,9,6,9\" user-name=\"Billy Smith\"";
    assert_eq!(
        host.to_html(),
        form_html(attrs, "BOOBARBAZ", "6, 9, 6, 9", "Billy Smith")
    );
    let renders = element.context().get();

    // Two writes, one render.
    assert!(element.methods().do_thing("hello world!", vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]));
    run_microtasks();
    let attrs = " foo=\"hello world!\" bar=\"0,0,0,1,0,0,0\" user-name=\"Billy Smith\"";
    assert_eq!(
        host.to_html(),
        form_html(attrs, "hello world!", "0, 0, 0, 1, 0, 0, 0", "Billy Smith")
    );
    assert_eq!(element.context().get(), renders + 1);
}

#[test]
fn test_three_writes_fire_once_then_once_more() {
    let host = setup("x-triple");
    let fired = Rc::new(Cell::new(0));

    let fired_clone = fired.clone();
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-triple", || ())
        .attribute("a", AttributeSpec::Text)
        .attribute("b", AttributeSpec::Text)
        .attribute("c", AttributeSpec::Text)
        .connect(move |api| {
            let a = api.attribute::<Text>("a").unwrap();
            let b = api.attribute::<Text>("b").unwrap();
            let c = api.attribute::<Text>("c").unwrap();
            let fired = fired_clone.clone();
            api.on_change(&[&a, &b, &c], move || fired.set(fired.get() + 1));
            None
        })
        .define()
        .unwrap();

    let element = definition.create(host.clone());
    element.connected();

    element.attribute::<Text>("a").unwrap().set("1".into());
    element.attribute::<Text>("b").unwrap().set("2".into());
    element.attribute::<Text>("c").unwrap().set("3".into());
    assert_eq!(fired.get(), 0);
    run_microtasks();
    assert_eq!(fired.get(), 1);

    host.set_attribute("b", "4");
    run_microtasks();
    assert_eq!(fired.get(), 2);

    // No change, no invocation.
    run_microtasks();
    assert_eq!(fired.get(), 2);
}

// =============================================================================
// Children
// =============================================================================

fn options_template(api: &MethodsApi<MemoryHost, Vec<String>>) -> MemoryNode {
    let div = MemoryNode::element("div");
    div.append_child(&span(&format!("Options: {}", api.context().join(", "))));
    div
}

fn option(text: &str) -> MemoryNode {
    let node = MemoryNode::element("option");
    node.set_text_content(text);
    node
}

#[test]
fn test_children_change_callback() {
    let host = setup("custom-elem-test2");

    let definition =
        ComponentConfig::<MemoryHost, Vec<String>, ()>::new("custom-elem-test2", Vec::new)
            .connect(|api| {
                api.render(&options_template(api));

                let api_clone = (**api).clone();
                api.on_children_change(move |children: &[MemoryNode]| {
                    *api_clone.context_mut() = children.iter().map(|c| c.text_content()).collect();
                    api_clone.render(&options_template(&api_clone));
                });
                None
            })
            .define()
            .unwrap();

    let element = definition.create(host.clone());
    element.connected();
    let content = |options: &str| {
        format!("<div class=\"spark-content\"><div><span>Options: {options}</span></div></div>")
    };
    assert_eq!(
        host.to_html(),
        format!("<custom-elem-test2>{}</custom-elem-test2>", content(""))
    );

    let option1 = option("option1");
    let option2 = option("option2");
    let option3 = option("option3");
    host.root_node().append_child(&option1);
    run_microtasks();
    assert_eq!(
        host.to_html(),
        format!(
            "<custom-elem-test2>{}<option>option1</option></custom-elem-test2>",
            content("option1")
        )
    );

    host.root_node().append_child(&option2);
    host.root_node().append_child(&option3);
    run_microtasks();
    assert_eq!(*element.context(), vec!["option1", "option2", "option3"]);

    option2.remove();
    run_microtasks();
    assert_eq!(
        host.to_html(),
        format!(
            "<custom-elem-test2>{}<option>option1</option><option>option3</option></custom-elem-test2>",
            content("option1, option3")
        )
    );

    // Reorder.
    host.root_node().append_child(&option1);
    run_microtasks();
    assert_eq!(*element.context(), vec!["option3", "option1"]);
    assert_eq!(element.children().len(), 2);
}

#[test]
fn test_children_mirrored_into_portal() {
    let host = setup("custom-elem-test3");

    let definition = ComponentConfig::<MemoryHost, (), ()>::new("custom-elem-test3", || ())
        .mirror_children(true)
        .connect(|api| {
            let wrapper = MemoryNode::element("div");
            wrapper.set_attribute("class", "portal-wrapper");
            if let Some(mirror) = api.mirror_container() {
                wrapper.append_child(&mirror);
            }
            api.render(&wrapper);
            None
        })
        .define()
        .unwrap();

    let element = definition.create(host.clone());
    element.connected();
    let page = |mirror: &str, children: &str| {
        format!(
            "<custom-elem-test3><div class=\"spark-content\"><div class=\"portal-wrapper\">\
             <div class=\"spark-children\">{mirror}</div></div></div>{children}</custom-elem-test3>"
        )
    };
    assert_eq!(host.to_html(), page("", ""));

    let child1 = MemoryNode::element("div");
    child1.set_text_content("this is child1");
    host.root_node().append_child(&child1);
    run_microtasks();
    let one = "<div>this is child1</div>";
    assert_eq!(host.to_html(), page(one, one));

    let child2 = MemoryNode::element("div");
    child2.set_text_content("this is child2");
    host.root_node().append_child(&child2);
    run_microtasks();
    let two = "<div>this is child1</div><div>this is child2</div>";
    assert_eq!(host.to_html(), page(two, two));

    // Replace child1's subtree.
    let outer = MemoryNode::element("div");
    let abc = MemoryNode::element("div");
    abc.set_attribute("class", "abc");
    abc.set_text_content("abc");
    outer.append_child(&abc);
    child1.clear_children();
    child1.append_child(&outer);
    run_microtasks();
    let nested = "<div><div><div class=\"abc\">abc</div></div></div><div>this is child2</div>";
    assert_eq!(host.to_html(), page(nested, nested));

    // Deep mutation.
    abc.set_text_content("def");
    run_microtasks();
    let nested = "<div><div><div class=\"abc\">def</div></div></div><div>this is child2</div>";
    assert_eq!(host.to_html(), page(nested, nested));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_remount_reconnects_and_keeps_values() {
    let host = setup("x-remount");
    let connects = Rc::new(Cell::new(0));
    let renders = Rc::new(Cell::new(0));
    let children_seen = Rc::new(Cell::new(0));

    let (c, r, s) = (connects.clone(), renders.clone(), children_seen.clone());
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-remount", || ())
        .attribute("foo", AttributeSpec::Text)
        .connect(move |api| {
            c.set(c.get() + 1);
            let foo = api.attribute::<Text>("foo").unwrap();
            let renders = r.clone();
            api.on_change(&[&foo], move || renders.set(renders.get() + 1));
            let seen = s.clone();
            api.on_children_change(move |_: &[MemoryNode]| seen.set(seen.get() + 1));
            None
        })
        .define()
        .unwrap();

    let element = definition.create(host.clone());
    let foo = element.attribute::<Text>("foo").unwrap();

    element.connected();
    foo.set("a".into());
    run_microtasks();
    assert_eq!(renders.get(), 1);

    assert!(element.disconnected());
    foo.set("b".into());
    host.root_node().append_child(&span("ignored"));
    run_microtasks();
    assert_eq!(renders.get(), 1);
    assert_eq!(children_seen.get(), 0);
    assert_eq!(foo.get().as_deref(), Some("b"));

    assert!(element.connected());
    assert_eq!(connects.get(), 2);
    assert_eq!(element.mount_count(), 2);
    assert!(foo.same_binding(&element.attribute::<Text>("foo").unwrap()));

    foo.set("c".into());
    host.root_node().append_child(&span("seen"));
    run_microtasks();
    assert_eq!(renders.get(), 2);
    assert_eq!(children_seen.get(), 1);
}

#[test]
fn test_unmount_drops_armed_batch() {
    let host = setup("x-armed");
    let renders = Rc::new(Cell::new(0));
    let cleaned = Rc::new(Cell::new(0));

    let (r, k) = (renders.clone(), cleaned.clone());
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-armed", || ())
        .attribute("foo", AttributeSpec::Text)
        .connect(move |api| {
            let foo = api.attribute::<Text>("foo").unwrap();
            let renders = r.clone();
            api.on_change(&[&foo], move || renders.set(renders.get() + 1));
            let cleaned = k.clone();
            api.defer_cleanup(move || cleaned.set(cleaned.get() + 1));
            let cleaned = k.clone();
            let teardown: Cleanup = Box::new(move || cleaned.set(cleaned.get() + 1));
            Some(teardown)
        })
        .define()
        .unwrap();

    let element = definition.create(host);
    element.connected();
    element.attribute::<Text>("foo").unwrap().set("x".into());
    element.disconnected();
    run_microtasks();

    assert_eq!(renders.get(), 0);
    assert_eq!(cleaned.get(), 2);

    // Unmounting again is a no-op.
    assert!(!element.disconnected());
    assert_eq!(cleaned.get(), 2);
}

#[test]
fn test_factories_run_once() {
    let host = setup("x-once");
    let contexts = Rc::new(Cell::new(0));
    let methods = Rc::new(Cell::new(0));

    let (c, m) = (contexts.clone(), methods.clone());
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-once", move || {
        c.set(c.get() + 1)
    })
    .methods(move |_| m.set(m.get() + 1))
    .define()
    .unwrap();

    let element = definition.create(host);
    for _ in 0..3 {
        element.connected();
        element.disconnected();
    }
    assert_eq!(contexts.get(), 1);
    assert_eq!(methods.get(), 1);
}

// =============================================================================
// Events
// =============================================================================

struct PickerMethods {
    api: MethodsApi<MemoryHost, ()>,
    selected: Attribute<Text>,
}

impl PickerMethods {
    fn select(&self, value: &str) -> Emission {
        let selected = self.selected.clone();
        let value = value.to_string();
        self.api
            .emit_event_with("ItemSelected", value.clone())
            .on_commit(move || selected.set(value))
    }
}

#[test]
fn test_emit_commit_and_cancel() {
    let host = setup("x-picker");
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-picker", || ())
        .attribute("selected", AttributeSpec::Text)
        .event("ItemSelected")
        .methods(|api| PickerMethods {
            api: api.clone(),
            selected: api.attribute("selected").unwrap(),
        })
        .define()
        .unwrap();
    let element = definition.create(host.clone());

    host.add_event_listener(
        "itemselected",
        Rc::new(|event: &ComponentEvent| {
            if event.detail::<String>().map(String::as_str) == Some("veto") {
                event.prevent_default();
            }
        }),
    );

    let cancelled = Rc::new(Cell::new(0));
    assert!(element.methods().select("apple").is_committed());
    assert_eq!(host.get_attribute("selected").as_deref(), Some("apple"));

    let cancelled_clone = cancelled.clone();
    let emission = element
        .methods()
        .select("veto")
        .on_cancel(move || cancelled_clone.set(cancelled_clone.get() + 1));
    assert!(emission.is_cancelled());
    assert_eq!(cancelled.get(), 1);
    assert_eq!(host.get_attribute("selected").as_deref(), Some("apple"));

    // Pre-built events are dispatched as-is.
    let raw = ComponentEvent::new("MixedCase").with_cancelable(false);
    assert!(element.api().dispatch(&raw).is_committed());
    assert_eq!(
        host.dispatched_events(),
        vec!["itemselected", "itemselected", "MixedCase"]
    );
}

#[test]
fn test_declarative_handler_slots() {
    let host = setup("x-slots");
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-slots", || ())
        .event("Close")
        .define()
        .unwrap();
    assert_eq!(definition.observed_attributes(), vec!["onclose"]);

    let element = definition.create(host.clone());
    let closes = Rc::new(Cell::new(0));
    let closes_clone = closes.clone();
    element
        .set_event_handler(
            "onclose",
            PropertyValue::Handler(Rc::new(move |_: &ComponentEvent| {
                closes_clone.set(closes_clone.get() + 1)
            })),
        )
        .unwrap();
    element.emit_event("close");
    assert_eq!(closes.get(), 1);

    assert_eq!(
        element.set_event_handler("onclose", PropertyValue::Text("close()".into())),
        Err(ComponentError::InvalidHandlerAssignment {
            slot: "onclose".into(),
            found: "string",
        })
    );
    // The rejected assignment leaves the handler in place.
    element.emit_event("close");
    assert_eq!(closes.get(), 2);

    // An inline attribute handler replaces the property handler.
    let inline = Rc::new(Cell::new(0));
    let inline_clone = inline.clone();
    host.register_inline_handler(
        "done()",
        Rc::new(move |_: &ComponentEvent| inline_clone.set(inline_clone.get() + 1)),
    );
    host.set_attribute("onclose", "done()");
    element.emit_event("close");
    assert_eq!((closes.get(), inline.get()), (2, 1));
    assert_eq!(host.listener_count("close"), 1);
}

// =============================================================================
// Definitions and codecs
// =============================================================================

#[test]
fn test_duplicate_definition_rejected() {
    let _host = setup("x-dup");
    let first = ComponentConfig::<MemoryHost, (), ()>::new("x-dup", || ()).define();
    assert!(first.is_ok());

    let second = ComponentConfig::<MemoryHost, (), ()>::new("x-dup", || ()).define();
    assert_eq!(second.unwrap_err(), ComponentError::AlreadyDefined("x-dup".into()));
}

#[derive(Clone, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

fn point_codec() -> Custom<Point> {
    Custom::new(
        |raw: &str| {
            let (x, y) = raw.split_once(';')?;
            Some(Point {
                x: x.parse().ok()?,
                y: y.parse().ok()?,
            })
        },
        // The origin is the default and is never stored.
        |point: &Point| (*point != Point { x: 0, y: 0 }).then(|| format!("{};{}", point.x, point.y)),
    )
}

#[test]
fn test_custom_codec_round_trip() {
    let host = setup("x-point");
    let definition = ComponentConfig::<MemoryHost, (), ()>::new("x-point", || ())
        .attribute("at", point_codec())
        .define()
        .unwrap();
    let element = definition.create(host.clone());

    let at = element.attribute::<Custom<Point>>("at").unwrap();
    assert_eq!(at.get(), None);

    at.set(Point { x: 3, y: -4 });
    assert_eq!(host.get_attribute("at").as_deref(), Some("3;-4"));
    assert_eq!(at.get(), Some(Point { x: 3, y: -4 }));

    // Encoding to nothing unsets the key.
    at.set(Point { x: 0, y: 0 });
    assert_eq!(host.get_attribute("at"), None);
    assert_eq!(at.get(), None);

    assert!(matches!(
        element.attribute::<Text>("at"),
        Err(ComponentError::AttributeTypeMismatch { .. })
    ));
}
