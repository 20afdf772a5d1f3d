//! Built-in colour maps and layout style resolution.

use radar_common::{ColormapSpec, QuicklookLayout};

use crate::error::RenderError;
use crate::gradient::{Color, Colormap};

/// NWS reflectivity scale, one step per 5 dBZ.
const NWS_REF: &[&str] = &[
    "#00ECEC", "#01A0F6", "#0000F6", "#00FF00", "#00C800", "#009000", "#FFFF00", "#E7C000",
    "#FF9000", "#FF0000", "#D60000", "#C00000", "#FF00FF", "#9955C9", "#FFFFFF",
];

/// Blue/brown/red diverging velocity scale.
const BU_D_RD_18: &[&str] = &[
    "#00008C", "#0000D9", "#0B2BFF", "#2E66FF", "#5294FF", "#7ABDFF", "#A3DDFF", "#CCF2FF",
    "#EBEBEB", "#EBEBEB", "#FFEBB3", "#FFD07A", "#FFAD52", "#FF7F33", "#F2401A", "#D9120D",
    "#A60000", "#730000",
];

const WILD_25: &[&str] = &[
    "#FFFFFF", "#D9D9FF", "#B3B3FF", "#8080FF", "#4D4DFF", "#1A1AFF", "#0059D9", "#0099B3",
    "#00CC80", "#00E64D", "#33FF00", "#80FF00", "#BFFF00", "#FFFF00", "#FFD900", "#FFB300",
    "#FF8C00", "#FF6600", "#FF4000", "#FF0000", "#D9001A", "#B30033", "#8C004D", "#660066",
    "#400040",
];

const THEODORE_16: &[&str] = &[
    "#404040", "#666666", "#8C8C8C", "#B3B3B3", "#0066FF", "#0099FF", "#00CCFF", "#00FFCC",
    "#00FF66", "#66FF00", "#CCFF00", "#FFE600", "#FFA600", "#FF6600", "#FF0000", "#B30000",
];

const HOMEYER_RAINBOW: &[&str] = &[
    "#7F00FF", "#3F1FFF", "#0060FF", "#00A5E6", "#00D9A6", "#40F266", "#A6F226", "#F2D900",
    "#FF9900", "#FF4D00", "#D90000", "#800000",
];

const REF_DIFF: &[&str] = &[
    "#4D4D4D", "#7F7F7F", "#B3B3B3", "#1A1AE6", "#4D80FF", "#66CCFF", "#33E64D", "#B3F21A",
    "#FFFF00", "#FFB300", "#FF6600", "#E60000", "#990000", "#FF00FF",
];

const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3E4A89", "#31688E", "#26828E", "#1F9E89", "#35B779", "#6ECE58",
    "#B5DE2B", "#FDE725",
];

const GREYS: &[&str] = &["#FFFFFF", "#000000"];

/// Names accepted in `colormap:` entries of a layout.
pub const BUILTIN_COLORMAPS: &[&str] = &[
    "NWSRef",
    "BuDRd18",
    "Wild25",
    "Theodore16",
    "HomeyerRainbow",
    "RefDiff",
    "Viridis",
    "Greys",
];

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Parse a hex colour into an opaque [`Color`].
pub fn parse_color(hex: &str) -> Result<Color, RenderError> {
    hex_to_rgb(hex)
        .map(|(r, g, b)| Color::rgb(r, g, b))
        .ok_or_else(|| RenderError::InvalidColor(hex.to_string()))
}

fn palette(hex: &[&str]) -> Vec<Color> {
    hex.iter()
        .filter_map(|h| hex_to_rgb(h))
        .map(|(r, g, b)| Color::rgb(r, g, b))
        .collect()
}

/// Look up a built-in colour map by name (case-insensitive).
pub fn named_colormap(name: &str) -> Option<Colormap> {
    let cmap = match name.to_ascii_lowercase().as_str() {
        "nwsref" => Colormap::discrete(palette(NWS_REF)),
        "budrd18" => Colormap::discrete(palette(BU_D_RD_18)),
        "wild25" => Colormap::discrete(palette(WILD_25)),
        "theodore16" => Colormap::discrete(palette(THEODORE_16)),
        "homeyerrainbow" => Colormap::continuous(palette(HOMEYER_RAINBOW)),
        "refdiff" => Colormap::continuous(palette(REF_DIFF)),
        "viridis" => Colormap::continuous(palette(VIRIDIS)),
        "greys" => Colormap::continuous(palette(GREYS)),
        _ => return None,
    };
    Some(cmap)
}

/// Resolve a layout colour-map reference.
///
/// Named maps accept an optional `pyart_` prefix. Explicit colour lists
/// become discrete maps with one bin per colour.
pub fn resolve_colormap(spec: &ColormapSpec) -> Result<Colormap, RenderError> {
    match spec {
        ColormapSpec::Named(name) => {
            let bare = name.strip_prefix("pyart_").unwrap_or(name);
            named_colormap(bare).ok_or_else(|| RenderError::UnknownColormap(name.clone()))
        }
        ColormapSpec::Listed(colors) => {
            let colors = colors
                .iter()
                .map(|c| parse_color(c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Colormap::discrete(colors))
        }
    }
}

/// Check every colour reference of a layout before any file is processed.
pub fn validate_layout_styles(layout: &QuicklookLayout) -> Result<(), RenderError> {
    parse_color(&layout.ring_color)?;
    for spec in &layout.panels {
        resolve_colormap(&spec.colormap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#CDCDCD"), Some((205, 205, 205)));
        assert_eq!(hex_to_rgb("ff0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("#FFF"), None);
        assert_eq!(hex_to_rgb("#GG0000"), None);
    }

    #[test]
    fn test_all_builtins_resolve() {
        for name in BUILTIN_COLORMAPS {
            let cmap = named_colormap(name).unwrap();
            assert!(cmap.len() >= 2, "{name}");
        }
        assert_eq!(named_colormap("NWSRef").unwrap().len(), NWS_REF.len());
        assert_eq!(named_colormap("BuDRd18").unwrap().len(), 18);
        assert_eq!(named_colormap("Wild25").unwrap().len(), 25);
        assert_eq!(named_colormap("Theodore16").unwrap().len(), 16);
    }

    #[test]
    fn test_pyart_prefix_and_unknown() {
        let spec = ColormapSpec::Named("pyart_NWSRef".to_string());
        assert!(resolve_colormap(&spec).is_ok());
        let spec = ColormapSpec::Named("jet".to_string());
        assert!(matches!(resolve_colormap(&spec), Err(RenderError::UnknownColormap(_))));
    }

    #[test]
    fn test_listed_colors() {
        let spec = ColormapSpec::Listed(vec!["#FFFFFF".into(), "#FF0000".into()]);
        let cmap = resolve_colormap(&spec).unwrap();
        assert!(cmap.is_discrete());
        assert_eq!(cmap.sample(0.9), Color::rgb(255, 0, 0));

        let spec = ColormapSpec::Listed(vec!["White".into()]);
        assert!(matches!(resolve_colormap(&spec), Err(RenderError::InvalidColor(_))));
    }

    #[test]
    fn test_default_layout_styles_valid() {
        validate_layout_styles(&QuicklookLayout::default()).unwrap();
    }
}
