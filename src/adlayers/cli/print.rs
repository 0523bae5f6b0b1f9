use adlayers::api::{CmdMessage, ListedLayer, MessageLevel};
use adlayers::model::LayerRef;
use adlayers::settings::{AdServerSettings, CompiledBreakpoint};
use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const STATUS_WIDTH: usize = 10;
const UNPRIORITIZED: &str = "-";

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        println!("{}", format_message(message));
    }
}

/// Messages of commands whose stdout is the rendered output.
pub(super) fn eprint_messages(messages: &[CmdMessage]) {
    for message in messages {
        eprintln!("{}", format_message(message));
    }
}

fn format_message(message: &CmdMessage) -> String {
    match message.level {
        MessageLevel::Info => message.content.dimmed().to_string(),
        MessageLevel::Success => message.content.green().to_string(),
        MessageLevel::Warning => message.content.yellow().to_string(),
        MessageLevel::Error => message.content.red().to_string(),
    }
}

pub(super) fn print_layers(layers: &[ListedLayer]) {
    if layers.is_empty() {
        println!("No ad layers found.");
        return;
    }

    let id_width = layers
        .iter()
        .map(|l| l.layer.id.to_string().width())
        .max()
        .unwrap_or(1);

    for listed in layers {
        let priority = match listed.priority {
            Some(p) => format!("{:>3}. ", p),
            None => format!("{:>3}  ", UNPRIORITIZED),
        };
        let id = format!("#{:<width$} ", listed.layer.id, width = id_width);

        let page_types = listed.layer.meta.page_types.join(", ");
        let title = if page_types.is_empty() {
            listed.layer.title.clone()
        } else {
            format!("{} ({})", listed.layer.title, page_types)
        };

        let fixed = priority.width() + id.width() + STATUS_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let title_display = truncate_to_width(&title, available);
        let padding = available.saturating_sub(title_display.width());

        let status = format!("{:>width$}", listed.layer.status, width = STATUS_WIDTH);
        let priority = match listed.priority {
            Some(_) => priority.yellow(),
            None => priority.dimmed(),
        };
        let status = if listed.layer.is_published() {
            status.green()
        } else {
            status.dimmed()
        };

        println!(
            "{}{}{}{}{}",
            priority,
            id.dimmed(),
            title_display,
            " ".repeat(padding),
            status
        );
    }
}

pub(super) fn print_layer(listed: &ListedLayer) -> serde_json::Result<()> {
    let priority = listed
        .priority
        .map(|p| p.to_string())
        .unwrap_or_else(|| UNPRIORITIZED.to_string());
    println!(
        "{} {}",
        format!("#{}", listed.layer.id).yellow(),
        listed.layer.title.bold()
    );
    println!("status: {}  priority: {}", listed.layer.status, priority);
    println!("--------------------------------");
    println!("{}", serde_json::to_string_pretty(&listed.layer.meta)?);
    Ok(())
}

pub(super) fn print_priority(priority: &[LayerRef]) {
    for (index, entry) in priority.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{:>3}.", index + 1).yellow(),
            format!("#{}", entry.post_id).dimmed(),
            entry.title
        );
    }
}

pub(super) fn print_settings(
    settings: &AdServerSettings,
    compiled: &[CompiledBreakpoint],
) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    let summary = format!("{} compiled breakpoint(s)", compiled.len());
    println!("{}", summary.dimmed());
    Ok(())
}

pub(super) fn print_list(items: &[String], empty: &str) {
    if items.is_empty() {
        println!("{}", empty.dimmed());
    }
    for item in items {
        println!("{}", item);
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}
