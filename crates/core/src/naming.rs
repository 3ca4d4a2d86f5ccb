//! Object key layout.
//!
//! Keys depend only on the output prefix and the tile index, so concurrent
//! writers never collide and the combiner can find every tile without a
//! listing.

/// File name of the final composite under the prefix.
pub const FINAL_IMAGE_NAME: &str = "final_image.png";

/// File name of a single-image render uploaded under the prefix.
pub const RENDER_IMAGE_NAME: &str = "fractal.png";

/// Directory (under the prefix) holding tile artifacts.
pub const TILES_DIR: &str = "tiles";

/// Content type written for every artifact.
pub const PNG_CONTENT_TYPE: &str = "image/png";

fn join(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{prefix}/{rest}")
    }
}

/// Key of a tile artifact: `{prefix}/tiles/{tile_index}.png`.
pub fn tile_key(prefix: &str, tile_index: u32) -> String {
    join(prefix, &format!("{TILES_DIR}/{tile_index}.png"))
}

/// Key of the final composite: `{prefix}/final_image.png`.
pub fn final_image_key(prefix: &str) -> String {
    join(prefix, FINAL_IMAGE_NAME)
}

/// Key of a single-image render: `{prefix}/fractal.png`.
pub fn render_image_key(prefix: &str) -> String {
    join(prefix, RENDER_IMAGE_NAME)
}
