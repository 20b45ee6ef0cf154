//! Process-wide header styling switch
//!
//! Header and index cells are bold, thin-bordered and centred unless styling
//! has been switched off. Switching it off affects every writer in the
//! process from then on; there is no way back.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder};
use std::sync::atomic::{AtomicBool, Ordering};

static HEADER_STYLING: AtomicBool = AtomicBool::new(true);

/// Suppress header styling for all subsequently written sheets
pub fn disable_header_styling() {
    HEADER_STYLING.store(false, Ordering::SeqCst);
}

pub fn header_styling_enabled() -> bool {
    HEADER_STYLING.load(Ordering::SeqCst)
}

/// Format for header and index cells, or `None` when styling is off
pub fn header_format() -> Option<Format> {
    if !header_styling_enabled() {
        return None;
    }
    Some(
        Format::new()
            .set_bold()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::Top),
    )
}
