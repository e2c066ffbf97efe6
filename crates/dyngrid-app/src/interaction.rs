// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Narrowest width a column can be resized to, in pixels.
pub const MIN_COLUMN_WIDTH: u32 = 100;

/// Widest a column can get, in pixels.
pub const MAX_COLUMN_WIDTH: u32 = 10_000;

/// Width used for columns that have never been resized.
pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

pub fn clamp_width(width: i64) -> u32 {
    let clamped = width.clamp(i64::from(MIN_COLUMN_WIDTH), i64::from(MAX_COLUMN_WIDTH));
    u32::try_from(clamped).unwrap_or(MAX_COLUMN_WIDTH)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Resizing {
        column: String,
        start_x: i32,
        start_width: u32,
        width: u32,
    },
    Dragging {
        column: String,
        origin_x: i32,
        pointer_x: i32,
    },
}

/// Gesture coordinator shared by the resizer and the dragger of one grid.
/// A gesture starts only from idle, so resizing and dragging never overlap.
#[derive(Debug, Clone, Default)]
pub struct ColumnInteraction {
    state: InteractionState,
}

impl ColumnInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn is_resizing(&self) -> bool {
        matches!(self.state, InteractionState::Resizing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging { .. })
    }

    pub fn begin_resize(&mut self, column: &str, x: i32, start_width: u32) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = InteractionState::Resizing {
            column: column.to_owned(),
            start_x: x,
            start_width,
            width: start_width,
        };
        true
    }

    /// Live width for the pointer at `x`, kept within [`MIN_COLUMN_WIDTH`] and [`MAX_COLUMN_WIDTH`].
    pub fn resize_to(&mut self, x: i32) -> Option<(String, u32)> {
        let InteractionState::Resizing {
            column,
            start_x,
            start_width,
            width,
        } = &mut self.state
        else {
            return None;
        };
        let delta = i64::from(x) - i64::from(*start_x);
        *width = clamp_width(i64::from(*start_width) + delta);
        Some((column.clone(), *width))
    }

    pub fn finish_resize(&mut self) -> Option<(String, u32)> {
        match std::mem::take(&mut self.state) {
            InteractionState::Resizing { column, width, .. } => Some((column, width)),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn begin_drag(&mut self, column: &str, x: i32) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = InteractionState::Dragging {
            column: column.to_owned(),
            origin_x: x,
            pointer_x: x,
        };
        true
    }

    pub fn drag_to(&mut self, x: i32) -> bool {
        match &mut self.state {
            InteractionState::Dragging { pointer_x, .. } => {
                *pointer_x = x;
                true
            }
            _ => false,
        }
    }

    /// Ends a drag and resolves where the column lands, if anywhere.
    pub fn finish_drag(&mut self, headers: &[HeaderSpan]) -> Option<ColumnMove> {
        match std::mem::take(&mut self.state) {
            InteractionState::Dragging {
                column, pointer_x, ..
            } => {
                let target = find_drop_target(headers, &column, pointer_x)?;
                Some(ColumnMove {
                    source: column,
                    target,
                })
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = InteractionState::Idle;
    }
}

/// Horizontal extent of a rendered header, in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpan {
    pub column: String,
    pub left: i32,
    pub width: u32,
}

impl HeaderSpan {
    pub fn new(column: &str, left: i32, width: u32) -> Self {
        Self {
            column: column.to_owned(),
            left,
            width,
        }
    }

    fn center(&self) -> f64 {
        f64::from(self.left) + f64::from(self.width) / 2.0
    }

    pub fn right(&self) -> i32 {
        self.left
            .saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPlacement {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub column: String,
    pub placement: DropPlacement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMove {
    pub source: String,
    pub target: DropTarget,
}

/// Nearest other header by center distance. A pointer farther from that
/// center than the header's own width lands nowhere.
pub fn find_drop_target(
    headers: &[HeaderSpan],
    dragged: &str,
    pointer_x: i32,
) -> Option<DropTarget> {
    let pointer = f64::from(pointer_x);
    let nearest = headers
        .iter()
        .filter(|header| header.column != dragged)
        .min_by(|left, right| {
            let left_distance = (pointer - left.center()).abs();
            let right_distance = (pointer - right.center()).abs();
            left_distance.total_cmp(&right_distance)
        })?;

    let distance = (pointer - nearest.center()).abs();
    if distance > f64::from(nearest.width) {
        return None;
    }

    let placement = if pointer < nearest.center() {
        DropPlacement::Before
    } else {
        DropPlacement::After
    };
    Some(DropTarget {
        column: nearest.column.clone(),
        placement,
    })
}

/// Moves `source` next to the target column. Unknown names leave the order
/// untouched.
pub fn apply_column_move(order: &[String], column_move: &ColumnMove) -> Vec<String> {
    if column_move.source == column_move.target.column
        || !order.contains(&column_move.source)
        || !order.contains(&column_move.target.column)
    {
        return order.to_vec();
    }
    let mut next: Vec<String> = order
        .iter()
        .filter(|name| **name != column_move.source)
        .cloned()
        .collect();
    let Some(target_index) = next
        .iter()
        .position(|name| *name == column_move.target.column)
    else {
        return order.to_vec();
    };
    let insert_at = match column_move.target.placement {
        DropPlacement::Before => target_index,
        DropPlacement::After => target_index + 1,
    };
    next.insert(insert_at, column_move.source.clone());
    next
}
