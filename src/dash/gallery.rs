// Photos of the encounters, looked up by date.

use chrono::NaiveDate;
use log::debug;
use std::path::{Path, PathBuf};

pub const DEFAULT_ASSET_DIR: &str = "assets/fotos_encontros";

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GalleryEntry {
    pub date: NaiveDate,
    pub caption: String,
    pub path: Option<PathBuf>,
}

pub fn photo_file_name(date: &NaiveDate) -> String {
    format!("{}.jpeg", date.format("%d-%m-%Y"))
}

/// Looks up the photo of each date. Dates without a photo keep an empty path.
pub fn find_photos(asset_dir: &Path, dates: &[NaiveDate]) -> Vec<GalleryEntry> {
    dates
        .iter()
        .map(|date| {
            let candidate = asset_dir.join(photo_file_name(date));
            let path = if candidate.is_file() {
                Some(candidate)
            } else {
                debug!("find_photos: no photo at {:?}", candidate);
                None
            };
            GalleryEntry {
                date: *date,
                caption: format!("Encontro - {}", date.format("%d-%m-%Y")),
                path,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_names() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(photo_file_name(&d), "05-03-2024.jpeg");
    }

    #[test]
    fn only_existing_photos() {
        let dir = std::env::temp_dir().join(format!("connectdash-gallery-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        fs::write(dir.join("05-03-2024.jpeg"), b"jpeg").unwrap();

        let entries = find_photos(&dir, &[d1, d2]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, Some(dir.join("05-03-2024.jpeg")));
        assert_eq!(entries[0].caption, "Encontro - 05-03-2024");
        assert_eq!(entries[1].path, None);

        assert!(find_photos(&dir.join("missing"), &[d1]).iter().all(|e| e.path.is_none()));
        fs::remove_dir_all(&dir).unwrap();
    }
}
