//! `Tree` and `TreeItem`: a hierarchical list control.
//!
//! Mostly guest-to-host calls; the overrideable surface is the drag-and-drop
//! trio.

use tether_core::method::ptrcall;
use tether_core::{
    host_class, host_enum, host_methods, virtual_interface, HostClass, ObjectRef, Rect2, Variant,
    Vector2,
};

host_class! {
    /// A tree control.
    pub struct Tree: "Control";
}

host_class! {
    /// One row of a [`Tree`].
    pub struct TreeItem: "Object";
}

host_enum! {
    pub enum SelectMode {
        SINGLE = 0,
        ROW = 1,
        MULTI = 2,
    }
}

host_enum! {
    /// Where a dragged item may be dropped. Values combine as bit flags.
    pub flags DropModeFlags {
        DISABLED = 0,
        ON_ITEM = 1,
        INBETWEEN = 2,
    }
}

host_methods! {
    impl Tree {
        /// Remove every item.
        pub fn clear(&self) = "clear", hash = 3218959716;
        pub fn get_root(&self) -> Option<TreeItem> = "get_root", hash = 1514277247;
        pub fn set_columns(&self, amount: i32) = "set_columns", hash = 1286410249;
        pub fn get_columns(&self) -> i32 = "get_columns", hash = 3905245786;
        pub fn set_column_title(&self, column: i32, title: &str) = "set_column_title";
        pub fn get_column_title(&self, column: i32) -> String = "get_column_title";
        pub fn set_column_expand(&self, column: i32, expand: bool) = "set_column_expand";
        pub fn set_column_custom_minimum_width(&self, column: i32, min_width: i32)
            = "set_column_custom_minimum_width";
        /// Current width of `column` in pixels.
        pub fn get_column_width(&self, column: i32) -> i32
            = "get_column_width", hash = 923996154;
        pub fn set_hide_root(&self, enable: bool) = "set_hide_root", hash = 2586408642;
        pub fn is_root_hidden(&self) -> bool = "is_root_hidden", hash = 36873697;
        pub fn set_select_mode(&self, mode: SelectMode) = "set_select_mode";
        pub fn get_select_mode(&self) -> SelectMode = "get_select_mode";
        pub fn deselect_all(&self) = "deselect_all", hash = 3218959716;
        pub fn get_selected_column(&self) -> i32 = "get_selected_column", hash = 3905245786;
        /// Column under `position`, or -1.
        pub fn get_column_at_position(&self, position: Vector2) -> i32
            = "get_column_at_position";
        pub fn get_item_area_rect(&self, item: &TreeItem, column: i32, button_index: i32) -> Rect2
            = "get_item_area_rect";
        pub fn scroll_to_item(&self, item: &TreeItem, center_on_item: bool) = "scroll_to_item";
        pub fn set_drop_mode_flags(&self, flags: DropModeFlags) = "set_drop_mode_flags";
        pub fn get_drop_mode_flags(&self) -> DropModeFlags = "get_drop_mode_flags";
    }
}

impl Tree {
    /// Create an item under `parent`, or as the root when `parent` is `None`.
    /// `index` is the position among its siblings; -1 appends.
    pub fn create_item(&self, parent: Option<&TreeItem>, index: i32) -> Option<TreeItem> {
        let parent: Option<&ObjectRef> = parent.map(HostClass::as_object);
        ptrcall(
            self.as_object(),
            Self::CLASS_NAME,
            "create_item",
            528467867,
            |frame| {
                frame.push(&parent).push(&index);
            },
        )
    }
}

host_methods! {
    impl TreeItem {
        pub fn set_text(&self, column: i32, text: &str) = "set_text";
        pub fn get_text(&self, column: i32) -> String = "get_text";
        pub fn get_parent(&self) -> Option<TreeItem> = "get_parent";
        pub fn get_child_count(&self) -> i32 = "get_child_count";
        pub fn get_tree(&self) -> Option<Tree> = "get_tree";
    }
}

virtual_interface! {
    /// Overrideable methods of [`Tree`].
    pub trait ITree for Tree {
        /// Data to drag from `at_position`; nil refuses the drag.
        fn get_drag_data(&mut self, at_position: Vector2) -> Variant = "_get_drag_data";
        fn can_drop_data(&mut self, at_position: Vector2, data: Variant) -> bool
            = "_can_drop_data";
        fn drop_data(&mut self, at_position: Vector2, data: Variant) = "_drop_data";
    }
}
