use std::path::{Path, PathBuf};

use icns::{IconFamily, IconType, PixelFormat};
use image::{imageops, RgbaImage};

/// Edge length of cached icons; everything is rasterized to this canvas.
pub const ICON_SIZE: u32 = 64;

/// An icon as raw RGBA pixel data.
#[derive(Debug, Clone)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// On-disk icon cache keyed by application name.
///
/// Each name maps to one stable `{dir}/{name}.png`. Files are written once
/// and never overwritten; the existence check is the cache hit path, so
/// re-resolving a name costs one stat instead of a PNG encode.
pub struct IconCache {
    dir: PathBuf,
}

impl IconCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Deterministic cache path for an application name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        // App names can contain path separators; keep every entry inside
        // the cache directory.
        let file = name.replace('/', "-");
        self.dir.join(format!("{file}.png"))
    }

    /// Return the cached path if an icon for this name is already on disk.
    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name);
        path.exists().then_some(path)
    }

    /// Resolve an icon to its stable on-disk PNG path, rasterizing and
    /// writing it on first use. A missing icon is not an error; any write
    /// failure is logged and also yields `None`.
    pub fn resolve(&self, name: &str, icon: Option<&IconImage>) -> Option<PathBuf> {
        let icon = icon?;
        let path = self.path_for(name);
        if path.exists() {
            return Some(path);
        }
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Failed to create icon cache dir {}: {}", self.dir.display(), e);
            return None;
        }
        let png = render_png(name, icon)?;
        if let Err(e) = std::fs::write(&path, &png) {
            tracing::warn!("Failed to write icon for {}: {}", name, e);
            return None;
        }
        Some(path)
    }

    /// Cached path for `name`, or a fresh render from the application
    /// bundle's icns resource on a miss.
    pub fn resolve_bundle(&self, name: &str, bundle_path: &str) -> Option<PathBuf> {
        if let Some(path) = self.lookup(name) {
            return Some(path);
        }
        let icon = load_bundle_icon(Path::new(bundle_path))?;
        self.resolve(name, Some(&icon))
    }
}

fn render_png(name: &str, icon: &IconImage) -> Option<Vec<u8>> {
    let rgba = match RgbaImage::from_raw(icon.width, icon.height, icon.pixels.clone()) {
        Some(rgba) => rgba,
        None => {
            tracing::warn!("Icon pixel buffer for {} does not match its dimensions", name);
            return None;
        }
    };
    let resized = imageops::resize(&rgba, ICON_SIZE, ICON_SIZE, imageops::FilterType::Lanczos3);
    let mut out = std::io::Cursor::new(Vec::new());
    if let Err(e) = resized.write_to(&mut out, image::ImageFormat::Png) {
        tracing::warn!("Failed to encode icon for {}: {}", name, e);
        return None;
    }
    Some(out.into_inner())
}

/// Load an application icon from a .app bundle as RGBA pixel data.
///
/// Reads `Contents/Info.plist` → `CFBundleIconFile` → `Contents/Resources/{icon}.icns`,
/// then extracts RGBA pixels. Returns `None` on any failure.
pub fn load_bundle_icon(bundle_path: &Path) -> Option<IconImage> {
    let icon_file = icon_file_from_plist(bundle_path)?;
    let icns_path = if icon_file.ends_with(".icns") {
        bundle_path.join("Contents/Resources").join(&icon_file)
    } else {
        bundle_path
            .join("Contents/Resources")
            .join(format!("{icon_file}.icns"))
    };

    load_icns_rgba(&icns_path)
}

/// Read `CFBundleIconFile` from the bundle's Info.plist.
fn icon_file_from_plist(bundle_path: &Path) -> Option<String> {
    let plist_path = bundle_path.join("Contents/Info.plist");
    let plist = plist::Value::from_file(plist_path).ok()?;
    plist
        .as_dictionary()
        .and_then(|dict| dict.get("CFBundleIconFile"))
        .and_then(|val| val.as_string())
        .map(|s| s.to_string())
}

/// Load an .icns file and extract RGBA pixel data.
fn load_icns_rgba(icns_path: &Path) -> Option<IconImage> {
    let file = std::io::BufReader::new(std::fs::File::open(icns_path).ok()?);
    let icon_family = IconFamily::read(file).ok()?;

    // Prefer entries at or just above the 64px render target; modern apps
    // often only ship 128x128+ or retina variants.
    let types_to_try = [
        IconType::RGBA32_128x128,
        IconType::RGB24_128x128,
        IconType::RGBA32_32x32_2x,
        IconType::RGBA32_256x256,
        IconType::RGB24_48x48,
        IconType::RGBA32_32x32,
        IconType::RGB24_32x32,
        IconType::RGBA32_128x128_2x,
        IconType::RGBA32_256x256_2x,
        IconType::RGBA32_512x512,
        IconType::RGBA32_512x512_2x,
    ];

    for icon_type in types_to_try {
        if let Ok(image) = icon_family.get_icon_with_type(icon_type) {
            let rgba = image.convert_to(PixelFormat::RGBA);
            let width = rgba.width();
            let height = rgba.height();
            return Some(IconImage {
                width,
                height,
                pixels: rgba.into_data().into_vec(),
            });
        }
    }

    None
}
