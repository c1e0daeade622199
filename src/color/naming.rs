//! Color naming
//!
//! Names a color after its nearest CSS named color in Lab space and groups
//! names into base color families (red, blue, gray, ...) so that clusters
//! can be compared by name as well as by distance.

use std::sync::OnceLock;

use palette::{Lab, Srgb};

use super::conversion::{delta_e, rgb8_to_lab, rgb_to_lab};

/// Base color words, checked in order; the last one contained in a name wins
const BASE_COLORS: [&str; 17] = [
    "red", "green", "blue", "yellow", "purple", "orange", "pink", "brown", "gray", "grey",
    "white", "black", "cyan", "magenta", "violet", "indigo", "teal",
];

/// CSS named colors (subset) as 8-bit sRGB
const CSS_COLORS: &[(&str, u8, u8, u8)] = &[
    ("black", 0, 0, 0),
    ("dim gray", 105, 105, 105),
    ("gray", 128, 128, 128),
    ("dark gray", 169, 169, 169),
    ("silver", 192, 192, 192),
    ("light gray", 211, 211, 211),
    ("gainsboro", 220, 220, 220),
    ("white smoke", 245, 245, 245),
    ("white", 255, 255, 255),
    ("maroon", 128, 0, 0),
    ("dark red", 139, 0, 0),
    ("firebrick", 178, 34, 34),
    ("brown", 165, 42, 42),
    ("crimson", 220, 20, 60),
    ("red", 255, 0, 0),
    ("indian red", 205, 92, 92),
    ("light coral", 240, 128, 128),
    ("salmon", 250, 128, 114),
    ("tomato", 255, 99, 71),
    ("coral", 255, 127, 80),
    ("orange red", 255, 69, 0),
    ("dark orange", 255, 140, 0),
    ("orange", 255, 165, 0),
    ("gold", 255, 215, 0),
    ("yellow", 255, 255, 0),
    ("khaki", 240, 230, 140),
    ("dark khaki", 189, 183, 107),
    ("beige", 245, 245, 220),
    ("wheat", 245, 222, 179),
    ("tan", 210, 180, 140),
    ("burlywood", 222, 184, 135),
    ("sandy brown", 244, 164, 96),
    ("peru", 205, 133, 63),
    ("chocolate", 210, 105, 30),
    ("sienna", 160, 82, 45),
    ("saddle brown", 139, 69, 19),
    ("rosy brown", 188, 143, 143),
    ("olive", 128, 128, 0),
    ("olive drab", 107, 142, 35),
    ("dark olive green", 85, 107, 47),
    ("yellow green", 154, 205, 50),
    ("lawn green", 124, 252, 0),
    ("lime", 0, 255, 0),
    ("lime green", 50, 205, 50),
    ("light green", 144, 238, 144),
    ("pale green", 152, 251, 152),
    ("green", 0, 128, 0),
    ("dark green", 0, 100, 0),
    ("forest green", 34, 139, 34),
    ("sea green", 46, 139, 87),
    ("medium sea green", 60, 179, 113),
    ("dark sea green", 143, 188, 143),
    ("spring green", 0, 255, 127),
    ("teal", 0, 128, 128),
    ("dark cyan", 0, 139, 139),
    ("light sea green", 32, 178, 170),
    ("turquoise", 64, 224, 208),
    ("aquamarine", 127, 255, 212),
    ("cyan", 0, 255, 255),
    ("pale turquoise", 175, 238, 238),
    ("cadet blue", 95, 158, 160),
    ("steel blue", 70, 130, 180),
    ("light steel blue", 176, 196, 222),
    ("light blue", 173, 216, 230),
    ("sky blue", 135, 206, 235),
    ("deep sky blue", 0, 191, 255),
    ("dodger blue", 30, 144, 255),
    ("cornflower blue", 100, 149, 237),
    ("royal blue", 65, 105, 225),
    ("blue", 0, 0, 255),
    ("medium blue", 0, 0, 205),
    ("dark blue", 0, 0, 139),
    ("navy", 0, 0, 128),
    ("midnight blue", 25, 25, 112),
    ("slate gray", 112, 128, 144),
    ("dark slate gray", 47, 79, 79),
    ("slate blue", 106, 90, 205),
    ("dark slate blue", 72, 61, 139),
    ("indigo", 75, 0, 130),
    ("purple", 128, 0, 128),
    ("dark magenta", 139, 0, 139),
    ("dark violet", 148, 0, 211),
    ("blue violet", 138, 43, 226),
    ("medium purple", 147, 112, 219),
    ("orchid", 218, 112, 214),
    ("violet", 238, 130, 238),
    ("plum", 221, 160, 221),
    ("thistle", 216, 191, 216),
    ("lavender", 230, 230, 250),
    ("magenta", 255, 0, 255),
    ("medium violet red", 199, 21, 133),
    ("deep pink", 255, 20, 147),
    ("hot pink", 255, 105, 180),
    ("pink", 255, 192, 203),
    ("light pink", 255, 182, 193),
    ("pale violet red", 219, 112, 147),
    ("ivory", 255, 255, 240),
    ("linen", 250, 240, 230),
    ("misty rose", 255, 228, 225),
    ("peach puff", 255, 218, 185),
    ("moccasin", 255, 228, 181),
];

struct NamedColor {
    name: &'static str,
    lab: Lab,
}

fn palette() -> &'static [NamedColor] {
    static PALETTE: OnceLock<Vec<NamedColor>> = OnceLock::new();
    PALETTE.get_or_init(|| {
        CSS_COLORS
            .iter()
            .map(|&(name, r, g, b)| NamedColor {
                name,
                lab: rgb8_to_lab(r, g, b),
            })
            .collect()
    })
}

/// Nearest named color and its ΔE distance
pub fn nearest_name_with_distance(lab: Lab) -> (&'static str, f32) {
    palette()
        .iter()
        .map(|c| (c.name, delta_e(lab, c.lab)))
        .fold(("unknown", f32::INFINITY), |best, cur| {
            if cur.1 < best.1 {
                cur
            } else {
                best
            }
        })
}

/// Name of the nearest CSS color in Lab space
pub fn color_name(lab: Lab) -> String {
    nearest_name_with_distance(lab).0.to_string()
}

/// Name of the nearest CSS color for an sRGB value
pub fn color_name_for_rgb(rgb: Srgb) -> String {
    color_name(rgb_to_lab(rgb))
}

/// Base color family contained in a name, if any
pub fn base_color_family(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    BASE_COLORS
        .iter()
        .rev()
        .find(|base| lowered.contains(*base))
        .copied()
}

/// Two names are similar when equal or when they share a base color family
pub fn are_names_similar(name1: &str, name2: &str) -> bool {
    if name1.eq_ignore_ascii_case(name2) {
        return true;
    }
    match (base_color_family(name1), base_color_family(name2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_css_colors() {
        assert_eq!(color_name(rgb8_to_lab(255, 0, 0)), "red");
        assert_eq!(color_name(rgb8_to_lab(0, 0, 255)), "blue");
        assert_eq!(color_name(rgb8_to_lab(255, 255, 255)), "white");
        assert_eq!(color_name(rgb8_to_lab(128, 128, 128)), "gray");
    }

    #[test]
    fn test_nearest_distance_is_zero_for_table_entry() {
        let (name, d) = nearest_name_with_distance(rgb8_to_lab(0, 128, 128));
        assert_eq!(name, "teal");
        assert!(d < 1e-3);
    }

    #[test]
    fn test_base_family() {
        assert_eq!(base_color_family("dark olive green"), Some("green"));
        assert_eq!(base_color_family("Steel Blue"), Some("blue"));
        assert_eq!(base_color_family("medium violet red"), Some("violet"));
        assert_eq!(base_color_family("khaki"), None);
    }

    #[test]
    fn test_name_similarity() {
        assert!(are_names_similar("sky blue", "navy blue"));
        assert!(are_names_similar("Khaki", "khaki"));
        assert!(!are_names_similar("sky blue", "forest green"));
        assert!(!are_names_similar("khaki", "tan"));
    }
}
