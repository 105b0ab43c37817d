use super::{
    class_depth, filter_summary, format_entity_row, indentation_prefix, progress_bar, show_lines,
    state_set_lines, Palette,
};
use crate::app::{EntityView, StateSetView};
use crate::domain::entity::Effort;
use crate::domain::entity_class::EntityClass;
use crate::listing::EntityListFilter;
use crate::test_support::{entity, task_states};

fn sample_view() -> EntityView {
    let mut row = entity("tk-1a2b", EntityClass::Task, 2i64)
        .with_parent("us-0001")
        .with_effort(Effort {
            estimated: 8.0,
            actual: 3.0,
        });
    row.title = "Wire up payments".to_string();
    EntityView {
        entity: row,
        status_label: "En progreso".to_string(),
        terminal: false,
    }
}

#[test]
fn rows_indent_by_hierarchy_and_show_effort() {
    let palette = Palette { enabled: false };
    assert_eq!(indentation_prefix(0, &palette), "");
    assert_eq!(class_depth(EntityClass::Epic), 0);
    assert_eq!(class_depth(EntityClass::Task), 2);

    let row = format_entity_row(&sample_view(), &palette);
    assert_eq!(row, "  ↳ tk-1a2b [En progreso] Wire up payments 3/8h");
}

#[test]
fn show_lines_include_raw_status_and_parent() {
    let palette = Palette { enabled: false };
    let lines = show_lines(&sample_view(), &palette);
    assert_eq!(lines[0], "tk-1a2b Wire up payments");
    assert!(lines.iter().any(|line| line.contains("[En progreso] (2)")));
    assert!(lines.iter().any(|line| line.starts_with("parent") && line.ends_with("us-0001")));
    assert!(lines.iter().any(|line| line.starts_with("estimate") && line.ends_with("8h")));
}

#[test]
fn state_set_lines_mark_default_final_and_reopen() {
    let palette = Palette { enabled: false };
    let view = StateSetView {
        class: EntityClass::Task,
        customized: true,
        customized_at: None,
        state_set: task_states(),
    };
    let lines = state_set_lines(&view, &palette);
    assert_eq!(lines[0], "task (customized)");
    assert!(lines[1].contains("Pendiente") && lines[1].contains("default"));
    assert!(lines[2].contains("reopen"));
    assert!(lines[3].contains("final, protected"));
    assert_eq!(lines.len(), 4);
}

#[test]
fn progress_bar_scales_to_width() {
    assert_eq!(progress_bar(0), format!("[{}]", "-".repeat(20)));
    assert_eq!(progress_bar(50), format!("[{}{}]", "#".repeat(10), "-".repeat(10)));
    assert_eq!(progress_bar(100), format!("[{}]", "#".repeat(20)));
}

#[test]
fn filter_summary_formats_only_active_filters() {
    let filter = EntityListFilter {
        include_all: true,
        class: Some(EntityClass::Story),
        parent_id: Some("ep-1".to_string()),
        status: Some(" ".to_string()),
        query: Some("checkout".to_string()),
    };
    assert_eq!(
        filter_summary(&filter).as_deref(),
        Some("all=true class=story parent=ep-1 query=checkout")
    );
    assert!(filter_summary(&EntityListFilter::default()).is_none());
}

#[test]
fn palette_paints_only_when_enabled() {
    let on = Palette { enabled: true };
    let off = Palette { enabled: false };
    assert_eq!(on.state("Hecha", true), "\x1b[32m[Hecha]\x1b[0m");
    assert_eq!(off.state("Hecha", true), "[Hecha]");
}
