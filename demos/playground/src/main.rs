//! Example pages exercising the scenarios in spec.md §8. Not part of the
//! reactive core (spec.md §1 scopes HTML templating/HTTP transport as
//! external collaborators) -- wiring a handful of routes against
//! `via-core`/`via-web` directly, the way the teacher's own example app
//! wires routes against `service`/`web`.

use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use serde_json::json;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use via_core::{Context, ParamKind, ParamSpec, Router};
use via_web::{AppState, WebConfig};

fn init_logging() {
    TermLogger::init(LevelFilter::Info, ConfigBuilder::new().build(), TerminalMode::Mixed, ColorChoice::Auto).expect("failed to start simplelog");
}

fn register_routes(router: &mut Router) {
    // S1: a shared counter -- every tab on /counter shares one signal and
    // one `increment` action scoped to `room:counter`.
    router.register(
        "/counter",
        vec![],
        Arc::new(|ctx: &Context, _params| {
            ctx.scope("room:counter");
            let count = ctx.signal(json!(0), Some("count"), None, true)?;
            ctx.action(
                Arc::new(|ctx| {
                    let count = ctx.signal(json!(0), Some("count"), None, true)?;
                    let next = count.get().as_i64().unwrap_or(0) + 1;
                    count.set(json!(next));
                    Ok(())
                }),
                Some("increment"),
                None,
            )?;
            let view_count = count.clone();
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("<h1 data-via-action=\"increment\">{}</h1>", view_count.get()))));
            Ok(())
        }),
    );

    // S2: a global notification counter -- `global` scope, reaches every
    // connected context regardless of route.
    router.register(
        "/notify",
        vec![],
        Arc::new(|ctx: &Context, _params| {
            ctx.scope("global");
            let unread = ctx.signal(json!(0), Some("unread"), Some("global"), true)?;
            ctx.action(
                Arc::new(|ctx| {
                    let unread = ctx.signal(json!(0), Some("unread"), Some("global"), true)?;
                    let next = unread.get().as_i64().unwrap_or(0) + 1;
                    unread.set(json!(next));
                    Ok(())
                }),
                Some("notify"),
                Some("global"),
            )?;
            let view_unread = unread.clone();
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("<span data-via-action=\"notify\">{} unread</span>", view_unread.get()))));
            Ok(())
        }),
    );

    // S3: a stock ticker -- one scope per symbol, a background timer
    // nudging the price and broadcasting to every viewer of that symbol.
    router.register(
        "/stock/{symbol}",
        vec![ParamSpec::new("symbol", ParamKind::Str)],
        Arc::new(|ctx: &Context, params| {
            let symbol = params["symbol"].as_str().unwrap_or("AAPL").to_string();
            ctx.scope(&format!("stock:{symbol}"));
            let price = ctx.signal(json!(100.0), Some("price"), None, true)?;

            let tick_price = price.clone();
            ctx.set_interval(Duration::from_secs(2), move |ctx| {
                let current = tick_price.get().as_f64().unwrap_or(100.0);
                let step = if (current as i64) % 2 == 0 { 0.5 } else { -0.5 };
                tick_price.set(json!((current + step).max(1.0)));
                ctx.broadcast();
            });

            let view_symbol = symbol.clone();
            let view_price = price.clone();
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("<h1>{view_symbol}: {:.2}</h1>", view_price.get().as_f64().unwrap_or(0.0)))));
            Ok(())
        }),
    );

    // S4/S5: a TAB-local ticking signal, used to exercise disconnect
    // survival (close the tab briefly; state is still there on reconnect
    // within the grace window) and the stale-reload path (open a second
    // tab carrying an old `via_ctx` query parameter).
    router.register(
        "/session",
        vec![],
        Arc::new(|ctx: &Context, _params| {
            let ticks = ctx.signal(json!(0), Some("ticks"), None, true)?;
            let tick_signal = ticks.clone();
            ctx.set_interval(Duration::from_secs(1), move |ctx| {
                let next = tick_signal.get().as_i64().unwrap_or(0) + 1;
                tick_signal.set(json!(next));
                ctx.sync_safe();
            });
            let view_ticks = ticks.clone();
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("<p>uptime ticks: {}</p>", view_ticks.get()))));
            Ok(())
        }),
    );

    // S6: a blog route with typed path parameters.
    router.register(
        "/blog/{year}/{month}/{slug}",
        vec![
            ParamSpec::new("year", ParamKind::Int),
            ParamSpec::new("month", ParamKind::Int),
            ParamSpec::new("slug", ParamKind::Str),
        ],
        Arc::new(|ctx: &Context, params| {
            let year = params["year"].as_i64().unwrap_or(0);
            let month = params["month"].as_i64().unwrap_or(0);
            let slug = params["slug"].as_str().unwrap_or("").to_string();
            ctx.view_callable(true, Arc::new(move |_ctx, _is_update| Ok(format!("<article>{year}-{month:02}: {slug}</article>"))));
            Ok(())
        }),
    );
}

#[tokio::main]
async fn main() {
    init_logging();

    let app = Arc::new(via_core::Application::new());
    let mut router = Router::new();
    register_routes(&mut router);

    let state = AppState::new(app, Arc::new(router), WebConfig::default());
    via_web::serve(state, "127.0.0.1", 4000).await.expect("server failed");
}
