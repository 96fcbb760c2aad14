//! Route pattern compilation, matching and handler invocation (spec.md §4.1).
//!
//! Rust has no runtime reflection over a closure's formal parameter names, so
//! the "inspect the handler's parameters by name" behaviour the spec
//! describes is implemented via the thin-adapter escape hatch spec.md §9
//! calls out explicitly: a route is registered together with a small
//! declarative `ParamSpec` list, and the handler receives an already-cast
//! [`ParamMap`] instead of individual positional arguments. The Context
//! argument itself is always passed, matching "the Context argument is
//! identified by type and passed first."

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::context::Context;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Nil,
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One formal parameter a page handler declares, besides the `Context`.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    /// Used when the path segment is absent. `None` means "optional" (bound
    /// to `ParamValue::Nil`); for a required parameter with no placeholder in
    /// the path, use `Some(ParamValue::Str(String::new()))` or similar.
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: ParamValue) -> Self {
        self.default = Some(default);
        self
    }
}

pub type ParamMap = HashMap<String, ParamValue>;

/// A page handler only configures the `Context` -- creating signals, actions
/// and a view via `ctx.view_*(...)` -- it never produces HTML itself.
/// The initial render and every later SSE update render both go through
/// [`crate::render::Renderer`] invoking the same registered view, so the
/// handler can't be the one holding the pen (spec.md §4.1, §4.5).
pub type PageHandler = Arc<dyn Fn(&Context, &ParamMap) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

fn compile(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|seg| {
            if let Some(name) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Segment::Placeholder(name.to_string())
            } else {
                Segment::Literal(seg.to_string())
            }
        })
        .collect()
}

struct Route {
    pattern: String,
    segments: Vec<Segment>,
    handler: PageHandler,
    param_specs: Vec<ParamSpec>,
}

impl Route {
    /// The registered pattern string, e.g. `/blog/{year}/{month}/{slug}`.
    /// via-web needs this ahead of invoking the handler, to build the
    /// `Context` the handler is given (spec.md §3: a Context's `route` is
    /// the pattern it was dispatched through, not the concrete path).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Holds an ordered list of (pattern, handler) pairs, spec.md §4.1.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn register(&mut self, pattern: &str, param_specs: Vec<ParamSpec>, handler: PageHandler) {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            segments: compile(pattern),
            handler,
            param_specs,
        });
    }

    /// `match(path)`: exact (no `{`) patterns are tried, in registration
    /// order, before parameterised ones, also in registration order.
    pub fn matching(&self, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let exact = self.routes.iter().filter(|r| !r.pattern.contains('{'));
        let parameterised = self.routes.iter().filter(|r| r.pattern.contains('{'));

        for route in exact.chain(parameterised) {
            if let Some(raw_params) = match_segments(&route.segments, &path_segments) {
                return Some((route, raw_params));
            }
        }
        None
    }

    /// `invoke`: cast the raw path parameters per the route's declared
    /// `ParamSpec`s and call the handler. Casting failures fall back to
    /// invoking the handler with an empty `ParamMap`, matching "parameter
    /// reflection errors fall back to handler(ctx) only."
    pub fn invoke(&self, ctx: &Context, path: &str) -> Option<Result<()>> {
        let (route, raw_params) = self.matching(path)?;
        let params = match bind_params(&route.param_specs, &raw_params) {
            Ok(params) => params,
            Err(name) => {
                warn!("route {}: failed to cast parameter '{name}', invoking handler with no parameters", route.pattern);
                ParamMap::new()
            }
        };
        Some((route.handler)(ctx, &params))
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> Option<HashMap<String, String>> {
    if pattern.len() != path.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (seg, value) in pattern.iter().zip(path.iter()) {
        match seg {
            Segment::Literal(lit) => {
                if lit != value {
                    return None;
                }
            }
            Segment::Placeholder(name) => {
                params.insert(name.clone(), value.to_string());
            }
        }
    }
    Some(params)
}

const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

fn cast(raw: &str, kind: ParamKind) -> Option<ParamValue> {
    match kind {
        ParamKind::Int => raw.parse::<i64>().ok().map(ParamValue::Int),
        ParamKind::Float => raw.parse::<f64>().ok().map(ParamValue::Float),
        ParamKind::Bool => Some(ParamValue::Bool(TRUTHY.contains(&raw.to_lowercase().as_str()))),
        ParamKind::Str => Some(ParamValue::Str(raw.to_string())),
    }
}

/// Returns `Err(param_name)` on the first cast failure.
fn bind_params(specs: &[ParamSpec], raw: &HashMap<String, String>) -> std::result::Result<ParamMap, &'static str> {
    let mut out = ParamMap::new();
    for spec in specs {
        let value = match raw.get(spec.name) {
            Some(raw_value) => match cast(raw_value, spec.kind) {
                Some(v) => v,
                None => return Err(spec.name),
            },
            None => spec
                .default
                .clone()
                .unwrap_or(if spec.kind == ParamKind::Str {
                    ParamValue::Str(String::new())
                } else {
                    ParamValue::Nil
                }),
        };
        out.insert(spec.name.to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Application;
    use std::sync::Arc;

    fn test_ctx() -> Context {
        let app = Arc::new(Application::new());
        Context::create(app, "/test", HashMap::new(), "sess-1".to_string())
    }

    /// Runs the handler via `invoke`, then renders the view it set up --
    /// mirroring what the initial-render caller (via-web's RequestHandler)
    /// does after a page handler returns.
    fn invoke_and_render(router: &Router, ctx: &Context, path: &str) -> Result<String> {
        router.invoke(ctx, path).unwrap()?;
        ctx.render_view_raw(false)
    }

    #[test]
    fn route_param_casting_matches_property_10() {
        let mut router = Router::new();
        router.register(
            "/blog/{year}/{month}/{slug}",
            vec![
                ParamSpec::new("year", ParamKind::Int),
                ParamSpec::new("month", ParamKind::Int),
                ParamSpec::new("slug", ParamKind::Str),
            ],
            Arc::new(|ctx, params| {
                let year = params["year"].as_i64().unwrap();
                let month = params["month"].as_i64().unwrap();
                let slug = params["slug"].as_str().unwrap().to_string();
                ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("{year}-{month}-{slug}"))));
                Ok(())
            }),
        );

        let ctx = test_ctx();
        let out = invoke_and_render(&router, &ctx, "/blog/2024/12/hello").unwrap();
        assert_eq!(out, "2024-12-hello");
    }

    #[test]
    fn bool_casting_accepts_truthy_set() {
        assert_eq!(cast("true", ParamKind::Bool), Some(ParamValue::Bool(true)));
        assert_eq!(cast("1", ParamKind::Bool), Some(ParamValue::Bool(true)));
        assert_eq!(cast("yes", ParamKind::Bool), Some(ParamValue::Bool(true)));
        assert_eq!(cast("on", ParamKind::Bool), Some(ParamValue::Bool(true)));
        assert_eq!(cast("false", ParamKind::Bool), Some(ParamValue::Bool(false)));
    }

    #[test]
    fn float_casting() {
        assert_eq!(cast("19.99", ParamKind::Float), Some(ParamValue::Float(19.99)));
    }

    fn view_handler(label: &'static str) -> PageHandler {
        Arc::new(move |ctx, _params| {
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(label.to_string())));
            Ok(())
        })
    }

    #[test]
    fn exact_routes_win_over_parameterised_routes() {
        let mut router = Router::new();
        router.register("/stock/{symbol}", vec![ParamSpec::new("symbol", ParamKind::Str)], view_handler("param"));
        router.register("/stock/aapl", vec![], view_handler("exact"));

        let ctx = test_ctx();
        let out = invoke_and_render(&router, &ctx, "/stock/aapl").unwrap();
        assert_eq!(out, "exact");
    }

    #[test]
    fn first_registered_match_wins_within_same_kind() {
        let mut router = Router::new();
        router.register("/a", vec![], view_handler("first"));
        router.register("/a", vec![], view_handler("second"));

        let ctx = test_ctx();
        let out = invoke_and_render(&router, &ctx, "/a").unwrap();
        assert_eq!(out, "first");
    }

    #[test]
    fn cast_failure_falls_back_to_empty_param_map() {
        let mut router = Router::new();
        router.register(
            "/n/{n}",
            vec![ParamSpec::new("n", ParamKind::Int)],
            Arc::new(|ctx, params| {
                let seen = format!("{:?}", params.get("n"));
                ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(seen.clone())));
                Ok(())
            }),
        );
        let ctx = test_ctx();
        let out = invoke_and_render(&router, &ctx, "/n/not-a-number").unwrap();
        assert_eq!(out, "None");
    }

    #[test]
    fn missing_optional_param_binds_nil() {
        let mut router = Router::new();
        router.register(
            "/greet",
            vec![ParamSpec::new("name", ParamKind::Str)],
            Arc::new(|ctx, params| {
                let seen = format!("{:?}", params["name"]);
                ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(seen.clone())));
                Ok(())
            }),
        );
        let ctx = test_ctx();
        // no placeholder in the pattern -> "name" is always absent from raw params
        let out = invoke_and_render(&router, &ctx, "/greet").unwrap();
        assert_eq!(out, format!("{:?}", ParamValue::Str(String::new())));
    }
}
