//! Template rendering for playbook config templates.
//!
//! Templates use the Go `text/template` dialect (via `gtmpl`) and see the
//! rendering context as `.Namespace`, `.Values`, and `.Release.Date`. A
//! curated text-transformation function library is registered on every
//! render. Environment-inspection functions are deliberately absent:
//! templates must not be able to read the host process environment.
//!
//! Snippet composition (`getFile "name"`) is resolved as a pre-parse
//! expansion pass: the referenced template file's raw text is inlined
//! before the template is parsed. A missing snippet fails the render with
//! a recoverable `Template` error.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use gtmpl::{Context, FuncError, Template, Value};
use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::types::{Config, ConfigTemplate, InventoryRelease};

const GET_FILE_PATTERN: &str = r#"\{\{-?\s*getFile\s+"([^"]+)"\s*-?\}\}"#;

/// Render one template against an inventory release.
///
/// `snippets` maps logical template names to their raw text, pre-fetched
/// for every `getFile` reference in the template source.
pub fn render(
    template: &ConfigTemplate,
    release: &InventoryRelease,
    snippets: &HashMap<String, String>,
) -> CoreResult<Config> {
    let source = expand_snippets(&template.name, &template.source, snippets)?;

    let mut tmpl = Template::default();
    register_funcs(&mut tmpl);
    tmpl.parse(&source).map_err(|e| CoreError::Template {
        name: template.name.clone(),
        message: format!("parse error: {e:?}"),
    })?;

    let content = tmpl
        .render(&Context::from(context_value(release)))
        .map_err(|e| CoreError::Template {
            name: template.name.clone(),
            message: format!("render error: {e:?}"),
        })?;

    Ok(Config {
        name: template.name.clone(),
        content,
    })
}

/// Logical names referenced by `getFile` calls in a template source.
pub fn snippet_refs(source: &str) -> Vec<String> {
    let pattern = Regex::new(GET_FILE_PATTERN).expect("getFile pattern is valid");
    pattern
        .captures_iter(source)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Inline every `getFile "name"` call with the named snippet's raw text.
fn expand_snippets(
    template_name: &str,
    source: &str,
    snippets: &HashMap<String, String>,
) -> CoreResult<String> {
    let pattern = Regex::new(GET_FILE_PATTERN).expect("getFile pattern is valid");

    let mut expanded = String::with_capacity(source.len());
    let mut last = 0;
    for cap in pattern.captures_iter(source) {
        let whole = cap.get(0).expect("capture 0 always present");
        let name = &cap[1];
        let text = snippets.get(name).ok_or_else(|| CoreError::Template {
            name: template_name.to_string(),
            message: format!("getFile: no template file named `{name}`"),
        })?;
        expanded.push_str(&source[last..whole.start()]);
        expanded.push_str(text);
        last = whole.end();
    }
    expanded.push_str(&source[last..]);
    Ok(expanded)
}

/// Build the root context value exposed to templates.
fn context_value(release: &InventoryRelease) -> Value {
    let values: HashMap<String, Value> = release
        .values
        .iter()
        .map(|(k, v)| (k.clone(), json_to_tmpl(v)))
        .collect();

    let mut rel = HashMap::new();
    rel.insert("Date".to_string(), Value::String(release.release.date.clone()));

    let mut root = HashMap::new();
    root.insert(
        "Namespace".to_string(),
        Value::String(release.namespace.clone()),
    );
    root.insert("Values".to_string(), Value::Map(values));
    root.insert("Release".to_string(), Value::Map(rel));
    Value::Map(root)
}

/// Convert a `serde_json::Value` into a template value.
fn json_to_tmpl(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                Value::Number(f.into())
            } else {
                Value::Nil
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(arr) => Value::Array(arr.iter().map(json_to_tmpl).collect()),
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_tmpl(v)))
                .collect();
            Value::Map(map)
        }
    }
}

/// Register the text-transformation function library.
///
/// Note the absence of `env`/`expandenv`: host environment access is not
/// exposed to playbook templates.
fn register_funcs(tmpl: &mut Template) {
    tmpl.add_func("upper", tmpl_upper);
    tmpl.add_func("lower", tmpl_lower);
    tmpl.add_func("title", tmpl_title);
    tmpl.add_func("trim", tmpl_trim);
    tmpl.add_func("quote", tmpl_quote);
    tmpl.add_func("squote", tmpl_squote);
    tmpl.add_func("indent", tmpl_indent);
    tmpl.add_func("nindent", tmpl_nindent);
    tmpl.add_func("replace", tmpl_replace);
    tmpl.add_func("repeat", tmpl_repeat);
    tmpl.add_func("join", tmpl_join);
    tmpl.add_func("default", tmpl_default);
    tmpl.add_func("b64enc", tmpl_b64enc);
    tmpl.add_func("b64dec", tmpl_b64dec);
}

// Pipelines append the piped value after any explicit arguments, so the
// subject of each function is the last argument.

fn string_arg(name: &str, args: &[Value], want: usize, index: usize) -> Result<String, FuncError> {
    if args.len() != want {
        return Err(FuncError::ExactlyXArgs(name.to_string(), want));
    }
    Ok(args[index].to_string())
}

fn int_arg(name: &str, args: &[Value], index: usize) -> Result<usize, FuncError> {
    match &args[index] {
        Value::Number(n) => n
            .as_u64()
            .map(|v| v as usize)
            .ok_or(FuncError::UnableToConvertFromValue),
        _ => Err(FuncError::Generic(format!(
            "{name}: argument {index} must be a number"
        ))),
    }
}

fn tmpl_upper(args: &[Value]) -> Result<Value, FuncError> {
    Ok(Value::String(string_arg("upper", args, 1, 0)?.to_uppercase()))
}

fn tmpl_lower(args: &[Value]) -> Result<Value, FuncError> {
    Ok(Value::String(string_arg("lower", args, 1, 0)?.to_lowercase()))
}

fn tmpl_title(args: &[Value]) -> Result<Value, FuncError> {
    let s = string_arg("title", args, 1, 0)?;
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    Ok(Value::String(out))
}

fn tmpl_trim(args: &[Value]) -> Result<Value, FuncError> {
    Ok(Value::String(
        string_arg("trim", args, 1, 0)?.trim().to_string(),
    ))
}

fn tmpl_quote(args: &[Value]) -> Result<Value, FuncError> {
    let s = string_arg("quote", args, 1, 0)?;
    Ok(Value::String(format!("\"{}\"", s.replace('"', "\\\""))))
}

fn tmpl_squote(args: &[Value]) -> Result<Value, FuncError> {
    let s = string_arg("squote", args, 1, 0)?;
    Ok(Value::String(format!("'{s}'")))
}

fn tmpl_indent(args: &[Value]) -> Result<Value, FuncError> {
    if args.len() != 2 {
        return Err(FuncError::ExactlyXArgs("indent".to_string(), 2));
    }
    let width = int_arg("indent", args, 0)?;
    let text = args[1].to_string();
    let pad = " ".repeat(width);
    let indented = text
        .lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Value::String(indented))
}

fn tmpl_nindent(args: &[Value]) -> Result<Value, FuncError> {
    match tmpl_indent(args)? {
        Value::String(s) => Ok(Value::String(format!("\n{s}"))),
        other => Ok(other),
    }
}

fn tmpl_replace(args: &[Value]) -> Result<Value, FuncError> {
    if args.len() != 3 {
        return Err(FuncError::ExactlyXArgs("replace".to_string(), 3));
    }
    let old = args[0].to_string();
    let new = args[1].to_string();
    let text = args[2].to_string();
    Ok(Value::String(text.replace(&old, &new)))
}

fn tmpl_repeat(args: &[Value]) -> Result<Value, FuncError> {
    if args.len() != 2 {
        return Err(FuncError::ExactlyXArgs("repeat".to_string(), 2));
    }
    let count = int_arg("repeat", args, 0)?;
    Ok(Value::String(args[1].to_string().repeat(count)))
}

fn tmpl_join(args: &[Value]) -> Result<Value, FuncError> {
    if args.len() != 2 {
        return Err(FuncError::ExactlyXArgs("join".to_string(), 2));
    }
    let sep = args[0].to_string();
    match &args[1] {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
            Ok(Value::String(parts.join(&sep)))
        }
        other => Ok(Value::String(other.to_string())),
    }
}

/// First non-empty argument, checked from the piped value backwards.
fn tmpl_default(args: &[Value]) -> Result<Value, FuncError> {
    for arg in args.iter().rev() {
        if !is_empty_value(arg) {
            return Ok(arg.clone());
        }
    }
    Ok(args.first().cloned().unwrap_or(Value::NoValue))
}

fn tmpl_b64enc(args: &[Value]) -> Result<Value, FuncError> {
    let s = string_arg("b64enc", args, 1, 0)?;
    Ok(Value::String(BASE64.encode(s.as_bytes())))
}

fn tmpl_b64dec(args: &[Value]) -> Result<Value, FuncError> {
    let s = string_arg("b64dec", args, 1, 0)?;
    let bytes = BASE64
        .decode(s.as_bytes())
        .map_err(|e| FuncError::Generic(format!("b64dec: {e}")))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|e| FuncError::Generic(format!("b64dec: {e}")))
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::NoValue | Value::Nil => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::Array(a) => a.is_empty(),
        Value::Map(m) => m.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Release, Values};

    fn release(namespace: &str, values: serde_json::Value) -> InventoryRelease {
        let values: Values = serde_json::from_value(values).unwrap();
        InventoryRelease {
            namespace: namespace.to_string(),
            values,
            release: Release {
                date: "202501010000".to_string(),
            },
        }
    }

    fn template(name: &str, source: &str) -> ConfigTemplate {
        ConfigTemplate {
            name: name.to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn renders_namespace_values_and_release() {
        let tpl = template(
            "deployment",
            "ns: {{.Namespace}}\nreplicas: {{.Values.replicas}}\nrelease: {{.Release.Date}}\n",
        );
        let rel = release("team-a", serde_json::json!({"replicas": 3}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.name, "deployment");
        assert_eq!(
            config.content,
            "ns: team-a\nreplicas: 3\nrelease: 202501010000\n"
        );
    }

    #[test]
    fn renders_nested_values() {
        let tpl = template("svc", "port: {{.Values.service.port}}");
        let rel = release("ns", serde_json::json!({"service": {"port": 8080}}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.content, "port: 8080");
    }

    #[test]
    fn function_pipeline_applies() {
        let tpl = template("cm", "{{.Values.name | upper | quote}}");
        let rel = release("ns", serde_json::json!({"name": "api"}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.content, "\"API\"");
    }

    #[test]
    fn default_falls_back_for_missing_value() {
        let tpl = template("cm", "{{.Values.owner | default \"nobody\"}}");
        let rel = release("ns", serde_json::json!({}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.content, "nobody");
    }

    #[test]
    fn env_function_is_not_available() {
        let tpl = template("cm", "{{env \"HOME\"}}");
        let rel = release("ns", serde_json::json!({}));

        let err = render(&tpl, &rel, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::Template { .. }));
    }

    #[test]
    fn get_file_inlines_snippet_text() {
        let tpl = template("cm", "labels:\n{{ getFile \"labels\" }}");
        let rel = release("ns", serde_json::json!({}));
        let mut snippets = HashMap::new();
        snippets.insert("labels".to_string(), "  app: {{.Namespace}}".to_string());

        let config = render(&tpl, &rel, &snippets).unwrap();
        assert_eq!(config.content, "labels:\n  app: ns");
    }

    #[test]
    fn get_file_missing_snippet_is_template_error() {
        let tpl = template("cm", "{{ getFile \"nope\" }}");
        let rel = release("ns", serde_json::json!({}));

        let err = render(&tpl, &rel, &HashMap::new()).unwrap_err();
        match err {
            CoreError::Template { name, message } => {
                assert_eq!(name, "cm");
                assert!(message.contains("nope"));
            }
            other => panic!("expected template error, got {other:?}"),
        }
    }

    #[test]
    fn snippet_refs_finds_all_names() {
        let source = "{{ getFile \"a\" }} x {{getFile \"b\"}} y {{- getFile \"c\" -}}";
        assert_eq!(snippet_refs(source), vec!["a", "b", "c"]);
    }

    #[test]
    fn indent_and_nindent() {
        let tpl = template("cm", "data:{{ .Values.text | nindent 2 }}");
        let rel = release("ns", serde_json::json!({"text": "a\nb"}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.content, "data:\n  a\n  b");
    }

    #[test]
    fn b64_round_trip() {
        let tpl = template("secret", "{{.Values.token | b64enc}}");
        let rel = release("ns", serde_json::json!({"token": "hunter2"}));

        let config = render(&tpl, &rel, &HashMap::new()).unwrap();
        assert_eq!(config.content, "aHVudGVyMg==");
    }

    #[test]
    fn parse_error_names_the_template() {
        let tpl = template("broken", "{{ .Values.x");
        let rel = release("ns", serde_json::json!({}));

        let err = render(&tpl, &rel, &HashMap::new()).unwrap_err();
        match err {
            CoreError::Template { name, .. } => assert_eq!(name, "broken"),
            other => panic!("expected template error, got {other:?}"),
        }
    }
}
