//! The `[ad-unit unit="code"]` content shortcode.
//!
//! Attribute values may be double-quoted, single-quoted or bare. A shortcode
//! wrapped in an extra pair of brackets (`[[ad-unit unit="x"]]`) is an escape
//! and is output as the literal shortcode.

use crate::context::RequestContext;
use crate::error::Result;
use crate::server::AdServer;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

pub const SHORTCODE: &str = "ad-unit";

static SHORTCODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\[?)\[ad-unit(\s[^\]]*)?\](\]?)").expect("shortcode pattern is valid")
});

static ATTRIBUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"']+))"#)
        .expect("attribute pattern is valid")
});

/// Parse shortcode attributes. Names are lowercased.
pub fn attributes(raw: &str) -> BTreeMap<String, String> {
    ATTRIBUTE_PATTERN
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_lowercase(), value.to_string())
        })
        .collect()
}

/// Markup for one shortcode. Empty without a `unit` attribute.
pub fn do_ad_unit(
    server: Option<&dyn AdServer>,
    ctx: &RequestContext<'_>,
    atts: &BTreeMap<String, String>,
) -> Result<String> {
    let Some(unit) = atts.get("unit").filter(|unit| !unit.is_empty()) else {
        return Ok(String::new());
    };
    match server {
        Some(server) => server.render_unit(ctx, unit),
        None => Ok(String::new()),
    }
}

/// Replace every ad unit shortcode in `content`.
pub fn render_content(
    server: Option<&dyn AdServer>,
    ctx: &RequestContext<'_>,
    content: &str,
) -> Result<String> {
    let mut output = String::with_capacity(content.len());
    let mut last = 0;
    for caps in SHORTCODE_PATTERN.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        output.push_str(&content[last..whole.start()]);
        output.push_str(&replacement(server, ctx, &caps)?);
        last = whole.end();
    }
    output.push_str(&content[last..]);
    Ok(output)
}

fn replacement(
    server: Option<&dyn AdServer>,
    ctx: &RequestContext<'_>,
    caps: &Captures<'_>,
) -> Result<String> {
    let open = caps.get(1).map_or("", |m| m.as_str());
    let close = caps.get(3).map_or("", |m| m.as_str());
    let raw = caps.get(2).map_or("", |m| m.as_str());

    if !open.is_empty() && !close.is_empty() {
        return Ok(format!("[{}{}]", SHORTCODE, raw));
    }
    let markup = do_ad_unit(server, ctx, &attributes(raw))?;
    Ok(format!("{}{}{}", open, markup, close))
}
