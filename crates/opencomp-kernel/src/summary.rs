//! Subject-area summary document.
//!
//! A two-column table: competency areas on the left, their essential
//! understandings on the right. General competency areas come first, then
//! each subdiscipline area with its own competency areas. Rows the viewer
//! cannot see are left out.
//!
//! Output is text (`render_text`) or serde data. Page layout and PDF
//! rendering belong to whatever consumes the serialized document.

use crate::error::TaxonomyError;
use crate::node::{Actor, NodeBody, NodeId, NodeKind};
use crate::tree::Taxonomy;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectAreaSummary {
    /// School name.
    pub title: String,
    /// Subject area label.
    pub subtitle: String,
    pub header: [String; 2],
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum SummaryRow {
    Subdiscipline { id: NodeId, label: String },
    CompetencyArea { id: NodeId, label: String },
    EssentialUnderstanding { id: NodeId, label: String },
}

impl SummaryRow {
    fn columns(&self) -> (String, &str) {
        match self {
            SummaryRow::Subdiscipline { label, .. } => (format!("[{label}]"), ""),
            SummaryRow::CompetencyArea { label, .. } => (label.clone(), ""),
            SummaryRow::EssentialUnderstanding { label, .. } => (String::new(), label),
        }
    }
}

impl SubjectAreaSummary {
    /// Fixed-width text rendering. Trailing whitespace is trimmed per line.
    pub fn render_text(&self) -> String {
        let cells: Vec<(String, &str)> = self.rows.iter().map(SummaryRow::columns).collect();
        let width = cells
            .iter()
            .map(|(left, _)| left.chars().count())
            .chain(std::iter::once(self.header[0].chars().count()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&self.subtitle);
        out.push_str("\n\n");
        let lines = std::iter::once((self.header[0].clone(), self.header[1].as_str())).chain(cells);
        for (left, right) in lines {
            let line = format!("{left:<width$} | {right}");
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn title_case(alias: &str) -> String {
    alias
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Taxonomy {
    /// Build the summary of one subject area as `viewer` sees it.
    pub fn subject_area_summary(
        &self,
        subject_area: NodeId,
        viewer: &Actor,
    ) -> Result<SubjectAreaSummary, TaxonomyError> {
        let sa = self.node_of_kind(NodeKind::SubjectArea, subject_area)?;
        if !self.is_effectively_visible(subject_area, viewer)? {
            return Err(TaxonomyError::node_not_found(subject_area));
        }
        let school = self.node(self.school_of(subject_area)?)?;
        let header = match &school.body {
            NodeBody::School {
                alias_ca, alias_eu, ..
            } => [title_case(alias_ca), title_case(alias_eu)],
            _ => [
                title_case(crate::node::DEFAULT_ALIAS_CA),
                title_case(crate::node::DEFAULT_ALIAS_EU),
            ],
        };

        let mut rows = Vec::new();
        self.push_competency_rows(subject_area, viewer, &mut rows)?;
        for sda in self.visible_children(subject_area, NodeKind::SubdisciplineArea, viewer)? {
            rows.push(SummaryRow::Subdiscipline {
                id: sda.id,
                label: sda.label.clone(),
            });
            self.push_competency_rows(sda.id, viewer, &mut rows)?;
        }

        Ok(SubjectAreaSummary {
            title: school.label.clone(),
            subtitle: sa.label.clone(),
            header,
            rows,
        })
    }

    fn push_competency_rows(
        &self,
        parent: NodeId,
        viewer: &Actor,
        rows: &mut Vec<SummaryRow>,
    ) -> Result<(), TaxonomyError> {
        for ca in self.visible_children(parent, NodeKind::CompetencyArea, viewer)? {
            rows.push(SummaryRow::CompetencyArea {
                id: ca.id,
                label: ca.label.clone(),
            });
            for eu in self.visible_children(ca.id, NodeKind::EssentialUnderstanding, viewer)? {
                rows.push(SummaryRow::EssentialUnderstanding {
                    id: eu.id,
                    label: eu.label.clone(),
                });
            }
        }
        Ok(())
    }
}
