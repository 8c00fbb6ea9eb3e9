//! Per-page resource tables (§4.2 step 5, §3.3 "page layout").
//!
//! A page's `/Resources` dictionary maps short names (`/F1`, `/Im1`, ...)
//! to the font/XObject references actually used on that page. The
//! document assigns object numbers once per unique font/image (§3.4
//! "the document deduplicates and co-owns"); a page just records which of
//! those it draws with, and under what short name.

use crate::object::{Dictionary, Name, ObjectId};

#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub fonts: Vec<(Name, ObjectId)>,
    pub xobjects: Vec<(Name, ObjectId)>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that font `id` is used on this page under `name`, unless
    /// already recorded.
    pub fn use_font(&mut self, name: Name, id: ObjectId) {
        if !self.fonts.iter().any(|(n, _)| n == &name) {
            self.fonts.push((name, id));
        }
    }

    /// Records that XObject `id` is used on this page under `name`, unless
    /// already recorded — repeated `Do` calls for the same image reuse
    /// the one entry, matching the "one XObject referenced thrice" rule.
    pub fn use_xobject(&mut self, name: Name, id: ObjectId) {
        if !self.xobjects.iter().any(|(n, _)| n == &name) {
            self.xobjects.push((name, id));
        }
    }

    pub fn find_font(&self, name: &str) -> Option<ObjectId> {
        self.fonts.iter().find(|(n, _)| n.0 == name).map(|(_, id)| *id)
    }

    pub fn find_xobject(&self, name: &str) -> Option<ObjectId> {
        self.xobjects.iter().find(|(n, _)| n.0 == name).map(|(_, id)| *id)
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        if !self.fonts.is_empty() {
            let mut fonts = Dictionary::new();
            for (name, id) in &self.fonts {
                fonts.set(name.clone(), *id);
            }
            dict.set("Font", fonts);
        }
        if !self.xobjects.is_empty() {
            let mut xobjects = Dictionary::new();
            for (name, id) in &self.xobjects {
                xobjects.set(name.clone(), *id);
            }
            dict.set("XObject", xobjects);
        }
        dict
    }
}
