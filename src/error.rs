use std::collections::TryReserveError;
use std::io;
use std::path::Path;

use miette::{miette, Report, Severity};

// Startup errors

pub fn image_open(path: &Path, err: &io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "image::open",
        help = "check that the path names a readable LC-3 object file.",
        "Failed to load image: {}: {err}",
        path.display(),
    )
}

pub fn image_no_origin(path: &Path) -> Report {
    miette!(
        severity = Severity::Error,
        code = "image::origin",
        help = "object files begin with a 16-bit big-endian load origin.",
        "Failed to load image: {}: shorter than one word",
        path.display(),
    )
}

// Resource errors

pub fn history_alloc(err: &TryReserveError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "debugger::history",
        help = "the command history needs a small up-front allocation.",
        "Failed to reserve debugger command history: {err}",
    )
}
