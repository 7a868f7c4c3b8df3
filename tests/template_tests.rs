//! Integration tests for command template rendering against inventory
//! variables.

mod common;

use common::*;
use hostexec::template::{
    self, lookup, parse_reference, render, ExpressionRenderer, LookupError, MiniJinjaRenderer,
    TemplateError, TemplateResult,
};
use hostexec::vars::Variables;
use pretty_assertions::assert_eq;

fn web1_vars() -> Variables {
    let dir = TestDir::new();
    tokio_test::block_on(dir.sample_inventory().host_variables("web1")).unwrap()
}

#[test]
fn test_render_inventory_variables() {
    let vars = web1_vars();
    assert_eq!(
        render("curl http://$inventory_hostname:${http_port}/", &vars),
        "curl http://web1:9090/"
    );
    assert_eq!(
        render("apt install ${packages[0]} ${packages[1]}", &vars),
        "apt install nginx curl"
    );
    assert_eq!(
        render("chown ${owner.name} /srv # uid ${owner.ids[1]}", &vars),
        "chown ops /srv # uid 9"
    );
}

#[test]
fn test_render_structured_values_as_json() {
    let vars = web1_vars();
    assert_eq!(render("$packages", &vars), r#"["nginx","curl"]"#);
    assert_eq!(render("$group_names", &vars), r#"["production","webservers"]"#);
}

#[test]
fn test_unresolved_placeholders_pass_through() {
    let vars = web1_vars();
    assert_eq!(render("echo $missing", &vars), "echo $missing");
    assert_eq!(render("echo ${packages[7]}", &vars), "echo ${packages[7]}");
    assert_eq!(render("echo ${owner.name", &vars), "echo ${owner.name");
    assert_eq!(render("cost: 5$ or $", &vars), "cost: 5$ or $");
    assert_eq!(render("$missing.role", &vars), "$missing.role");
}

#[test]
fn test_bare_name_ends_at_identifier() {
    let vars = web1_vars();
    assert_eq!(
        render("tail /var/log/$inventory_hostname.log", &vars),
        "tail /var/log/web1.log"
    );
    assert_eq!(render("$role.missing", &vars), "web.missing");
    assert_eq!(render("$packages[x]", &vars), r#"["nginx","curl"][x]"#);
    assert_eq!(render("$packages[0]", &vars), r#"["nginx","curl"][0]"#);
}

#[test]
fn test_lookup_errors() {
    let vars = web1_vars();
    assert!(matches!(lookup("missing", &vars), Err(LookupError::NotFound(_))));
    assert!(matches!(
        parse_reference("packages["),
        Err(LookupError::Invalid(_))
    ));
    assert_eq!(parse_reference("owner.ids[1]").unwrap().segments().len(), 2);
}

#[test]
fn test_template_with_minijinja() {
    let vars = web1_vars();
    let engine = MiniJinjaRenderer::new();

    let rendered = template::template(
        "{% for p in packages %}$inventory_hostname:{{ p }}\n{% endfor %}",
        &vars,
        Some(&engine),
    )
    .unwrap();
    assert_eq!(rendered, "web1:nginx\nweb1:curl\n");

    // Without an engine brace expressions are left alone
    let rendered = template::template("{{ role }} $role", &vars, None).unwrap();
    assert_eq!(rendered, "{{ role }} web");
}

#[test]
fn test_template_engine_errors_surface() {
    let vars = web1_vars();
    let engine = MiniJinjaRenderer::new();
    let err = template::template("{{ unclosed", &vars, Some(&engine)).unwrap_err();
    assert!(matches!(err, TemplateError::Render(_)));
}

#[test]
fn test_custom_renderer() {
    struct Upper;

    impl ExpressionRenderer for Upper {
        fn render(&self, text: &str, _scope: &Variables) -> TemplateResult<String> {
            Ok(text.to_uppercase())
        }
    }

    let vars = web1_vars();
    let rendered = template::template("{{ $role }}", &vars, Some(&Upper)).unwrap();
    assert_eq!(rendered, "{{ WEB }}");
}
