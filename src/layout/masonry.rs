use crate::models::{ColumnModel, ImageRecord, Placement};

/// Configuration for the masonry (shortest column next) layout.
///
/// Every column has the same width; an item's height follows its source
/// aspect ratio scaled to that width.
#[derive(Debug, Clone)]
pub struct MasonryLayout {
    /// Column width in pixels (default: 180)
    pub column_width: f32,
    /// Height used when an item has no usable dimensions (default: 220)
    pub default_height: f32,
    /// Vertical gap between items in a column in pixels (default: 8)
    pub gap: f32,
}

impl Default for MasonryLayout {
    fn default() -> Self {
        Self {
            column_width: 180.0,
            default_height: 220.0,
            gap: 8.0,
        }
    }
}

impl MasonryLayout {
    pub fn new(column_width: f32, default_height: f32, gap: f32) -> Self {
        Self {
            column_width,
            default_height,
            gap,
        }
    }

    /// Display height of one tile at the configured column width.
    pub fn display_height(&self, item: &ImageRecord) -> f32 {
        match item.aspect_ratio() {
            Some(ar) if ar.is_finite() => self.column_width.max(1.0) / ar,
            _ => self.default_height.max(1.0),
        }
    }

    /// Starts an empty layout that items can be pushed onto one at a time.
    pub fn start(&self, columns: usize) -> MasonryState {
        MasonryState::new(self.clone(), columns)
    }

    /// Computes placements for `items`, returned in item order.
    ///
    /// # Algorithm
    /// 1. Keep a running height per column, starting at zero.
    /// 2. For each item, place it in the column with the smallest running
    ///    height (lowest index on ties).
    /// 3. Add the item's height plus the gap to that column.
    ///
    /// `columns` of zero is treated as a single column.
    pub fn compute(&self, items: &[ImageRecord], columns: usize) -> Vec<Placement> {
        let mut state = self.start(columns);
        state.extend(items);
        state.into_placements()
    }

    /// Same as `compute`, grouped by column for renderers that draw column-wise.
    pub fn compute_columns(&self, items: &[ImageRecord], columns: usize) -> Vec<ColumnModel> {
        let mut state = self.start(columns);
        state.extend(items);
        state.to_columns()
    }
}

/// Running state of a masonry layout.
///
/// Appending never moves anything already placed, so a feed that grows by a
/// page only pays for the new items.
#[derive(Debug, Clone)]
pub struct MasonryState {
    layout: MasonryLayout,
    heights: Vec<f32>,
    placements: Vec<Placement>,
}

impl MasonryState {
    pub fn new(layout: MasonryLayout, columns: usize) -> Self {
        Self {
            layout,
            heights: vec![0.0; columns.max(1)],
            placements: Vec::new(),
        }
    }

    fn shortest_column(&self) -> usize {
        let mut best = 0;
        for (idx, h) in self.heights.iter().enumerate().skip(1) {
            if *h < self.heights[best] {
                best = idx;
            }
        }
        best
    }

    pub fn push(&mut self, item: &ImageRecord) -> &Placement {
        let display_h = self.layout.display_height(item);
        let column = self.shortest_column();
        let top = self.heights[column];
        self.heights[column] += display_h + self.layout.gap;
        self.placements.push(Placement {
            image_id: item.id.clone(),
            column,
            top,
            display_h,
        });
        &self.placements[self.placements.len() - 1]
    }

    pub fn extend(&mut self, items: &[ImageRecord]) {
        self.placements.reserve(items.len());
        for item in items {
            self.push(item);
        }
    }

    pub fn column_count(&self) -> usize {
        self.heights.len()
    }

    /// Running height of each column, gaps included.
    pub fn column_heights(&self) -> &[f32] {
        &self.heights
    }

    /// Height of the tallest column, without the trailing gap.
    pub fn total_height(&self) -> f32 {
        self.heights
            .iter()
            .map(|h| (h - self.layout.gap).max(0.0))
            .fold(0.0, f32::max)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn to_columns(&self) -> Vec<ColumnModel> {
        let mut columns: Vec<ColumnModel> = self
            .heights
            .iter()
            .enumerate()
            .map(|(idx, h)| ColumnModel::new(idx, (h - self.layout.gap).max(0.0), Vec::new()))
            .collect();
        for placement in &self.placements {
            columns[placement.column].items.push(placement.clone());
        }
        columns
    }
}

/// Column count for a viewport width: phones get 2, tablets 3, wide screens 4.
pub fn column_count_for_width(viewport_width: f32) -> usize {
    if viewport_width >= 1024.0 {
        4
    } else if viewport_width >= 768.0 {
        3
    } else {
        2
    }
}
