//! # Built-in Blocks
//!
//! The fixed catalog of scaffolding blocks: program entry points, the HTTP
//! server skeleton, routing, lifecycle hooks, map literals and the basic
//! value blocks the editor ships with.

use super::go_codegen::{Emitter, Fragment, Order};
use super::literal::{go_string_literal, normalize_quoted_value, scan_qualifiers, unquote_literal};
use crate::block::{format_number, BlockInstance};
use crate::error::{GoBlocksError, Result};
use crate::registry::{BlockRegistry, BlockShape, BlockTypeDescriptor, FieldKind, InputSpec};

pub const HTTP_METHODS: [&str; 6] = ["GET", "PUT", "PATCH", "POST", "DELETE", "OPTIONS"];

/// Register every built-in block type
pub fn register_builtin_blocks(registry: &mut BlockRegistry) {
    registry.register(
        BlockTypeDescriptor::new("require", "Import", BlockShape::Statement)
            .input(InputSpec::value("VALUE", "Import", true))
            .colour(230)
            .tooltip("Import Go package"),
        generate_require,
    );

    registry.register(
        BlockTypeDescriptor::new("main", "Main", BlockShape::Root)
            .input(InputSpec::statement("children", "Main"))
            .colour(105)
            .tooltip("Defines a program's main function"),
        generate_main,
    );

    registry.register(
        BlockTypeDescriptor::new("server", "Server", BlockShape::Root)
            .input(InputSpec::statement("children", "Server"))
            .input(InputSpec::field("port", "Port", FieldKind::Number { default: 8080.0 }))
            .input(InputSpec::field(
                "hostname",
                "Hostname",
                FieldKind::Text { default: "127.0.0.1".to_string() },
            ))
            .colour(105)
            .tooltip("Defines a server root"),
        generate_server,
    );

    registry.register(
        BlockTypeDescriptor::new("route_group", "Route Group", BlockShape::Statement)
            .input(InputSpec::statement("NAME", "Route Group"))
            .colour(345)
            .tooltip("Define a Web api route group"),
        generate_route_group,
    );

    registry.register(
        BlockTypeDescriptor::new("route", "Route", BlockShape::Statement)
            .input(InputSpec::field("path", "Path", FieldKind::Text { default: "/hello".to_string() }))
            .input(InputSpec::field(
                "method",
                "Method",
                FieldKind::Dropdown {
                    options: HTTP_METHODS.iter().map(|m| m.to_string()).collect(),
                },
            ))
            .input(InputSpec::statement("sub", "Sub routes"))
            .input(InputSpec::field(
                "handler",
                "Handler",
                FieldKind::Text { default: "pkg.Handler(w, r)".to_string() },
            ))
            .colour(345)
            .tooltip("Individual route"),
        generate_route,
    );

    registry.register(
        BlockTypeDescriptor::new("on_start", "On Server start", BlockShape::Statement)
            .input(InputSpec::statement("NAME", "On Server start"))
            .colour(230)
            .tooltip("Code to run on server boot"),
        generate_on_start,
    );

    registry.register(
        BlockTypeDescriptor::new("on_shutdown", "On Server shutdown", BlockShape::Statement)
            .input(InputSpec::statement("NAME", "On Server shutdown"))
            .colour(230)
            .tooltip("Code to run on server exit"),
        generate_on_shutdown,
    );

    registry.register(
        BlockTypeDescriptor::new("go", "Go", BlockShape::Statement)
            .input(InputSpec::field(
                "line",
                "Go",
                FieldKind::Text { default: "println(\"Sample\")".to_string() },
            ))
            .colour(230)
            .tooltip("Line of Go code"),
        generate_go_line,
    );

    registry.register(
        BlockTypeDescriptor::new("interface", "Map", BlockShape::Value)
            .input(InputSpec::statement("ints", "Map"))
            .colour(230)
            .tooltip("Go interface"),
        generate_map,
    );

    registry.register(
        BlockTypeDescriptor::new("field", "Field", BlockShape::Statement)
            .input(InputSpec::field("key", "Key", FieldKind::Text { default: "key_name".to_string() }))
            .input(InputSpec::value("NAME", "Value", false))
            .colour(230)
            .tooltip("Go interface field"),
        generate_map_field,
    );

    registry.register(
        BlockTypeDescriptor::new("handler", "HTTP Handler", BlockShape::Statement)
            .input(InputSpec::field("path", "Path", FieldKind::Text { default: "/".to_string() }))
            .input(InputSpec::field("func", "Handler", FieldKind::Text { default: "pkg.handler".to_string() }))
            .colour(45)
            .tooltip("Adds a handler to your server"),
        generate_handler,
    );

    registry.register(
        BlockTypeDescriptor::new("text", "Text", BlockShape::Value)
            .input(InputSpec::field("TEXT", "", FieldKind::Text { default: String::new() }))
            .colour(160)
            .tooltip("A letter, word, or line of text"),
        generate_text,
    );

    registry.register(
        BlockTypeDescriptor::new("math_number", "Number", BlockShape::Value)
            .input(InputSpec::field("NUM", "", FieldKind::Number { default: 0.0 }))
            .colour(230)
            .tooltip("A number"),
        generate_number,
    );

    registry.register(
        BlockTypeDescriptor::new("logic_boolean", "Boolean", BlockShape::Value)
            .input(InputSpec::field(
                "BOOL",
                "",
                FieldKind::Dropdown {
                    options: vec!["TRUE".to_string(), "FALSE".to_string()],
                },
            ))
            .colour(210)
            .tooltip("Returns either true or false"),
        generate_boolean,
    );
}

fn generate_require(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let value = emitter.value_to_code(block, "VALUE", Order::Atomic)?;
    if value.is_empty() {
        return Ok(Fragment::empty());
    }

    let path = unquote_literal(&value).ok_or_else(|| GoBlocksError::InvalidField {
        block: block.id.clone(),
        field: "VALUE".to_string(),
        reason: format!("import path must be a string literal, got {}", value),
    })?;

    if path.trim().is_empty() || emitter.is_import_candidate(&path) {
        return Ok(Fragment::empty());
    }
    Ok(Fragment::statement("").with_import(path))
}

fn generate_main(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let body = emitter.statement_to_code(block, "children")?;

    let mut fragment = Fragment::statement(format!("func main() {{\n{}}}\n", body));
    for path in emitter.infer_imports(&[]) {
        fragment = fragment.with_import(path);
    }
    Ok(fragment)
}

fn generate_server(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let port = block.field_number_or("port", 8080.0)?;
    if port.fract() != 0.0 || !(0.0..=65535.0).contains(&port) {
        return Err(GoBlocksError::InvalidField {
            block: block.id.clone(),
            field: "port".to_string(),
            reason: format!("{} is not a valid port", port),
        });
    }
    let hostname = block.field_text_or("hostname", "127.0.0.1");
    let addr = go_string_literal(&format!("{}:{}", hostname.trim(), format_number(port)));

    let body = emitter.statement_to_code(block, "children")?;
    let i = emitter.indent().to_string();

    let mut code = String::from("func main() {\n");
    code.push_str(&format!("{i}h := &http.Server{{Addr: {addr}}}\n\n"));
    if !body.is_empty() {
        code.push_str(&body);
        code.push('\n');
    }
    code.push_str(&format!("{i}http.HandleFunc(\"/\", apiHandler)\n\n"));
    code.push_str(&format!("{i}err := h.ListenAndServe()\n"));
    code.push_str(&format!("{i}if err != nil {{\n"));
    code.push_str(&format!("{i}{i}log.Println(err)\n"));
    code.push_str(&format!("{i}}}\n"));
    code.push_str("}\n");

    emitter.use_package("http");
    emitter.use_package("log");

    let mut fragment = Fragment::statement(code);
    for path in emitter.infer_imports(&["log"]) {
        fragment = fragment.with_import(path);
    }
    Ok(fragment)
}

fn generate_route_group(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let routes = emitter.statement_to_code(block, "NAME")?;
    let i = emitter.indent().to_string();

    let mut code = String::from("apiHandler := func(w http.ResponseWriter, r *http.Request) {\n");
    if !routes.is_empty() {
        code.push_str(&format!("{i}path := \"\"\n"));
        code.push_str(&routes);
    }
    code.push_str("}\n");

    Ok(Fragment::statement(code).uses("http"))
}

/// Routes match on the path accumulated by their enclosing routes, so a
/// sub-route `/users` inside `/api` serves `/api/users`.
fn generate_route(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let path = block.field_text_or("path", "/hello");
    let method = parse_method(block)?;
    let handler = block.field_text_or("handler", "").trim().to_string();

    let sub_routes = emitter.statement_to_code(block, "sub")?;
    emitter.use_packages(scan_qualifiers(&handler));
    let i = emitter.indent().to_string();
    let segment = go_string_literal(&path);

    let mut code = format!(
        "if strings.HasPrefix(r.URL.Path, path+{segment}) && r.Method == {} {{\n",
        go_string_literal(method)
    );
    code.push_str(&format!("{i}path = path + {segment}\n"));
    code.push_str(&sub_routes);
    if !handler.is_empty() {
        code.push_str(&format!("{i}{handler}\n"));
    }
    code.push_str(&format!("{i}return\n"));
    code.push_str("}\n");

    Ok(Fragment::statement(code).uses("strings"))
}

fn parse_method(block: &BlockInstance) -> Result<&'static str> {
    let method = block.field_text_or("method", "GET").trim().to_ascii_uppercase();
    if method == "OPTION" {
        return Ok("OPTIONS");
    }
    HTTP_METHODS
        .iter()
        .copied()
        .find(|m| *m == method)
        .ok_or_else(|| GoBlocksError::InvalidField {
            block: block.id.clone(),
            field: "method".to_string(),
            reason: format!("unsupported HTTP method '{}'", method),
        })
}

fn generate_on_start(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    Ok(Fragment::statement(emitter.statement_sequence(block, "NAME")?))
}

fn generate_on_shutdown(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let hooks = emitter.statement_to_code(block, "NAME")?;
    let i = emitter.indent().to_string();

    let mut code = String::new();
    code.push_str("stop := make(chan os.Signal, 1)\n");
    code.push_str("signal.Notify(stop, os.Interrupt)\n\n");
    code.push_str("go func() {\n");
    code.push_str(&format!("{i}<-stop\n"));
    code.push_str(&format!("{i}log.Println(\"Shutting down the server...\")\n\n"));
    code.push_str(&format!(
        "{i}ctx, cancel := context.WithTimeout(context.Background(), 5*time.Second)\n"
    ));
    code.push_str(&format!("{i}defer cancel()\n"));
    code.push_str(&format!("{i}h.Shutdown(ctx)\n\n"));
    code.push_str(&hooks);
    code.push_str(&format!("{i}log.Println(\"Server gracefully stopped\")\n"));
    code.push_str("}()\n");

    Ok(Fragment::statement(code)
        .uses("os")
        .uses("signal")
        .uses("log")
        .uses("context")
        .uses("time"))
}

/// Emits the line untouched
fn generate_go_line(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let line = block.field_text_or("line", "");
    if line.trim().is_empty() {
        return Ok(Fragment::empty());
    }
    emitter.use_packages(scan_qualifiers(&line));
    Ok(Fragment::statement(format!("{}\n", line)))
}

fn generate_map(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let entries = emitter.statement_to_code(block, "ints")?;
    let code = if entries.is_empty() {
        "map[string]interface{}{}".to_string()
    } else {
        format!("map[string]interface{{}}{{\n{}}}", entries)
    };
    Ok(Fragment::value(code, Order::None))
}

fn generate_map_field(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let key = block.field_text_or("key", "key_name");
    let value = emitter.value_to_code(block, "NAME", Order::None)?;
    let value = if value.is_empty() {
        "nil".to_string()
    } else {
        normalize_quoted_value(&value)
    };
    Ok(Fragment::statement(format!("{}: {},\n", go_string_literal(&key), value)))
}

fn generate_handler(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let path = block.field_text_or("path", "/");
    let func = block.field_text_or("func", "").trim().to_string();
    if func.is_empty() {
        return Ok(Fragment::empty());
    }
    emitter.use_packages(scan_qualifiers(&func));
    Ok(
        Fragment::statement(format!("http.HandleFunc({}, {})\n", go_string_literal(&path), func))
            .uses("http"),
    )
}

fn generate_text(_emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let text = block.field_text_or("TEXT", "");
    Ok(Fragment::value(go_string_literal(&text), Order::Atomic))
}

fn generate_number(_emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let n = block.field_number_or("NUM", 0.0)?;
    if !n.is_finite() {
        return Err(GoBlocksError::InvalidField {
            block: block.id.clone(),
            field: "NUM".to_string(),
            reason: format!("{} is not a finite number", n),
        });
    }
    let order = if n < 0.0 { Order::Unary } else { Order::Atomic };
    Ok(Fragment::value(format_number(n), order))
}

fn generate_boolean(_emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
    let value = block.field_flag_or("BOOL", true);
    Ok(Fragment::value(if value { "true" } else { "false" }, Order::Atomic))
}
