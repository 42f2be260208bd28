//! ALV grid (`GuiGridView`) facade and table snapshots

use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::platforms::{ForeignHandle, Variant};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct GridView {
    base: ComponentBase,
}

impl GridView {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, is_grid, "GuiGridView").map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, is_grid, "GuiGridView").map(|base| Self { base })
    }

    fn count(&self, member: &str) -> Result<usize, SapError> {
        Ok(self.base.required_i64(member)?.max(0) as usize)
    }

    pub fn visible_row_count(&self) -> Result<usize, SapError> {
        self.count("VisibleRowCount")
    }

    pub fn row_count(&self) -> Result<usize, SapError> {
        self.count("RowCount")
    }

    pub fn column_count(&self) -> Result<usize, SapError> {
        self.count("ColumnCount")
    }

    fn cell_target(&self, row: usize, column: &str) -> String {
        format!("{} row {} column '{}'", self.base.handle().describe(), row, column)
    }

    /// Value of the cell at 0-based `row` in the column with technical name `column`.
    pub fn get_cell_value(&self, row: usize, column: &str) -> Result<String, SapError> {
        self.base
            .handle()
            .call("GetCellValue", &[Variant::from(row), Variant::from(column)])
            .and_then(|value| value.into_string("GetCellValue"))
            .map_err(|e| e.with_context("GetCellValue", &self.cell_target(row, column)))
    }

    pub fn set_cell_value(&self, row: usize, column: &str, value: &str) -> Result<(), SapError> {
        self.base
            .handle()
            .call(
                "SetCellValue",
                &[Variant::from(row), Variant::from(column), Variant::from(value)],
            )
            .map(|_| ())
            .map_err(|e| e.with_context("SetCellValue", &self.cell_target(row, column)))
    }

    pub fn set_current_cell(&self, row: usize, column: &str) -> Result<(), SapError> {
        self.base
            .handle()
            .call("SetCurrentCell", &[Variant::from(row), Variant::from(column)])
            .map(|_| ())
            .map_err(|e| e.with_context("SetCurrentCell", &self.cell_target(row, column)))
    }

    pub fn double_click_current_cell(&self) -> Result<(), SapError> {
        self.base.required_call("DoubleClickCurrentCell", &[])?;
        Ok(())
    }

    fn columns(&self, member: &'static str) -> Result<GridColumns, SapError> {
        let columns = self
            .base
            .handle()
            .get("Columns")
            .and_then(|value| value.into_object("Columns"))
            .map_err(|e| e.with_context("read Columns", &self.base.handle().describe()))?;
        let count = match &columns {
            Some(columns) => columns
                .get_i64("Count")
                .map_err(|e| e.with_context("read Columns.Count", &columns.describe()))?
                .max(0) as usize,
            None => 0,
        };
        Ok(GridColumns {
            columns,
            member,
            next: 0,
            count,
        })
    }

    /// Technical column names, in display order. Single pass.
    pub fn column_technical_names(&self) -> Result<GridColumns, SapError> {
        self.columns("Name")
    }

    /// Column titles, in display order. Single pass.
    pub fn column_titles(&self) -> Result<GridColumns, SapError> {
        self.columns("Title")
    }

    /// Reads every row into a [`GridTable`].
    ///
    /// A cell that cannot be read is logged and stored as `None`; only
    /// failures reading the column layout or row count abort the snapshot.
    #[instrument(level = "debug", skip(self), fields(grid = %self.base.handle().describe()))]
    pub fn as_table(&self) -> Result<GridTable, SapError> {
        let names = self.column_technical_names()?.collect::<Result<Vec<_>, _>>()?;
        let titles = self.column_titles()?.collect::<Result<Vec<_>, _>>()?;
        let labels = names.iter().enumerate().map(|(i, name)| {
            match titles.get(i).filter(|t| !t.is_empty()) {
                Some(title) => title.clone(),
                None => name.clone(),
            }
        });
        let columns = unique_labels(labels);

        let row_count = self.row_count()?;
        debug!("Reading {} rows x {} columns", row_count, names.len());
        let mut rows = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let values = names
                .iter()
                .map(|name| match self.get_cell_value(row, name) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Could not read cell ({}, {}): {}", row, name, e);
                        None
                    }
                })
                .collect();
            rows.push(values);
        }
        Ok(GridTable { columns, rows })
    }
}

fn is_grid(kind: &ComponentKind) -> bool {
    *kind == ComponentKind::GridView
}

impl Component for GridView {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    /// Grids carry no text of their own.
    fn text(&self) -> Result<String, SapError> {
        Ok(String::new())
    }

    fn set_text(&self, _text: &str) -> Result<(), SapError> {
        debug!("Ignoring text write on grid");
        Ok(())
    }
}

/// Appends `_1`, `_2`, ... to labels that were already used.
fn unique_labels(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .map(|label| {
            let mut candidate = label.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{label}_{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}

/// One pass over the grid's column collection.
///
/// Call [`GridView::column_technical_names`] or [`GridView::column_titles`]
/// again to enumerate a second time.
pub struct GridColumns {
    columns: Option<ForeignHandle>,
    member: &'static str,
    next: usize,
    count: usize,
}

impl Iterator for GridColumns {
    type Item = Result<String, SapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns.as_ref()?;
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let member = self.member;
        let value = columns
            .call("ElementAt", &[Variant::from(index)])
            .and_then(|column| column.into_object("ElementAt"))
            .and_then(|column| match column {
                Some(column) => column.get_string(member),
                None => Err(SapError::ElementNotFound(format!("column {index}"))),
            })
            .map_err(|e| {
                e.with_context(&format!("read column {index} {member}"), &columns.describe())
            });
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.columns {
            Some(_) => self.count.saturating_sub(self.next),
            None => 0,
        };
        (remaining, Some(remaining))
    }
}

/// Snapshot of a grid: one label per column, one `Option` per cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl GridTable {
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Cell at `row` under column `label`; `None` if either is unknown or the
    /// cell could not be read.
    pub fn cell(&self, row: usize, label: &str) -> Option<&str> {
        let column = self.column_index(label)?;
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column label.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(label, value)| {
                        let value = value
                            .as_ref()
                            .map_or(serde_json::Value::Null, |v| serde_json::Value::from(v.as_str()));
                        (label.clone(), value)
                    })
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}
