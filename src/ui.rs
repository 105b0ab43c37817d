use std::io::{self, IsTerminal};

use crate::app::{EntityChange, EntityView, ProgressReport, StateSetView};
use crate::domain::entity_class::EntityClass;
use crate::listing::EntityListFilter;

const BAR_WIDTH: usize = 20;

pub fn print_entity_list(views: &[EntityView], filter: &EntityListFilter) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Entities"));
    if let Some(summary) = filter_summary(filter) {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if views.is_empty() {
        println!("{}", palette.dim("no entities matched"));
        return;
    }

    for view in views {
        println!("{}", format_entity_row(view, &palette));
    }
    println!("{}", palette.dim(&format!("{} entit(ies)", views.len())));
}

pub fn print_entity_show(view: &EntityView) {
    let palette = Palette::auto();
    for line in show_lines(view, &palette) {
        println!("{line}");
    }
}

pub fn print_entity_change(change: &EntityChange) {
    let palette = Palette::auto();
    let entity = &change.entity.entity;
    match (&change.previous_status, change.changed) {
        (Some(previous), true) => println!(
            "{} {} -> {}",
            palette.id(&entity.id),
            previous,
            palette.state(&change.entity.status_label, change.entity.terminal)
        ),
        (Some(_), false) => println!(
            "{} already {}",
            palette.id(&entity.id),
            palette.state(&change.entity.status_label, change.entity.terminal)
        ),
        (None, _) => println!(
            "created {} {} {}",
            palette.id(&entity.id),
            palette.state(&change.entity.status_label, change.entity.terminal),
            entity.title
        ),
    }

    for update in &change.cascade {
        println!(
            "  {} {} {} {} -> {} ({}%)",
            palette.dim("↳"),
            update.class,
            palette.id(&update.id),
            update.from,
            update.to,
            update.percentage
        );
    }
}

pub fn print_progress(report: &ProgressReport) {
    let palette = Palette::auto();
    let entity = &report.entity.entity;
    println!(
        "{} {} {}",
        palette.id(&entity.id),
        palette.state(&report.entity.status_label, report.entity.terminal),
        entity.title
    );
    println!(
        "{} {}% ({}/{} complete)",
        progress_bar(report.percentage),
        report.percentage,
        report.completed,
        report.children
    );
    if let Some(status) = report
        .parent_transition
        .as_ref()
        .and_then(|transition| transition.new_status.as_ref())
    {
        println!("{}", palette.dim(&format!("pending transition -> {status}")));
    }
}

pub fn print_state_sets(views: &[StateSetView]) {
    let palette = Palette::auto();
    for (index, view) in views.iter().enumerate() {
        if index > 0 {
            println!();
        }
        for line in state_set_lines(view, &palette) {
            println!("{line}");
        }
    }
}

fn format_entity_row(view: &EntityView, palette: &Palette) -> String {
    let entity = &view.entity;
    let indent = indentation_prefix(class_depth(entity.class), palette);
    let mut line = format!(
        "{}{} {} {}",
        indent,
        palette.id(&entity.id),
        palette.state(&view.status_label, view.terminal),
        entity.title
    );
    if let Some(effort) = entity.effort {
        line.push(' ');
        line.push_str(&palette.dim(&format!("{}/{}h", effort.actual, effort.estimated)));
    }
    line
}

fn class_depth(class: EntityClass) -> usize {
    let mut depth = 0;
    let mut current = class;
    while let Some(parent) = current.parent_class() {
        depth += 1;
        current = parent;
    }
    depth
}

fn indentation_prefix(depth: usize, palette: &Palette) -> String {
    if depth == 0 {
        return String::new();
    }
    let spaces = "  ".repeat(depth.saturating_sub(1));
    palette.dim(&format!("{spaces}↳ "))
}

fn show_lines(view: &EntityView, palette: &Palette) -> Vec<String> {
    let entity = &view.entity;
    let mut lines = vec![
        format!("{} {}", palette.id(&entity.id), entity.title),
        format!("{:<10} {}", "class", entity.class),
        format!(
            "{:<10} {} ({})",
            "status",
            palette.state(&view.status_label, view.terminal),
            entity.status
        ),
    ];
    if let Some(parent) = entity.parent_id.as_deref() {
        lines.push(format!("{:<10} {}", "parent", parent));
    }
    if let Some(effort) = entity.effort {
        lines.push(format!("{:<10} {}h", "estimate", effort.estimated));
        lines.push(format!("{:<10} {}h", "actual", effort.actual));
    }
    if let Some(completed) = entity.completed_at {
        lines.push(format!("{:<10} {}", "completed", completed));
    }
    lines.push(format!("{:<10} {}", "created", entity.created_at));
    lines.push(format!("{:<10} {}", "updated", entity.updated_at));
    lines
}

fn state_set_lines(view: &StateSetView, palette: &Palette) -> Vec<String> {
    let set = &view.state_set;
    let mut heading = palette.heading(view.class.as_str());
    if let Some(at) = view.customized_at.as_deref() {
        heading.push(' ');
        heading.push_str(&palette.dim(&format!("(customized {at})")));
    } else if view.customized {
        heading.push(' ');
        heading.push_str(&palette.dim("(customized)"));
    }

    let mut lines = vec![heading];
    for state in set.ordered_states() {
        let mut markers = Vec::new();
        if *set.default_state() == state.id {
            markers.push("default");
        }
        if set.final_states().contains(&state.id) {
            markers.push("final");
        }
        if set.reopen_state() == Some(&state.id) {
            markers.push("reopen");
        }
        if state.is_protected {
            markers.push("protected");
        }
        let mut line = format!("  {:<12} {}", state.id.to_string(), state.label);
        if !markers.is_empty() {
            line.push(' ');
            line.push_str(&palette.dim(&format!("[{}]", markers.join(", "))));
        }
        lines.push(line);
    }
    lines
}

fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn filter_summary(filter: &EntityListFilter) -> Option<String> {
    let mut parts = Vec::new();
    if filter.include_all {
        parts.push("all=true".to_string());
    }
    if let Some(class) = filter.class {
        parts.push(format!("class={class}"));
    }
    if let Some(parent) = filter.parent_id.as_deref().and_then(non_empty) {
        parts.push(format!("parent={parent}"));
    }
    if let Some(status) = filter.status.as_deref().and_then(non_empty) {
        parts.push(format!("status={status}"));
    }
    if let Some(query) = filter.query.as_deref().and_then(non_empty) {
        parts.push(format!("query={query}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn state(&self, label: &str, terminal: bool) -> String {
        let code = if terminal { "32" } else { "33" };
        self.paint(code, &format!("[{label}]"))
    }
}

#[cfg(test)]
#[path = "ui_tests_ext.rs"]
mod tests;
