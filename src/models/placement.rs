#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image_id: String,
    pub column: usize,
    pub top: f32,
    pub display_h: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub column_index: usize,
    pub height_px: f32,
    pub items: Vec<Placement>,
}

impl ColumnModel {
    pub fn new(column_index: usize, height_px: f32, items: Vec<Placement>) -> Self {
        Self {
            column_index,
            height_px,
            items,
        }
    }
}
