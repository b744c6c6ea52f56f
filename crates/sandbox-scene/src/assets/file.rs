use std::path::{Path, PathBuf};
use std::thread;

use futures::channel::oneshot;
use image::ImageError;

use sandbox_engine::device::ImageData;

use crate::error::AssetLoadFailure;

use super::{AssetSource, ResourceId};

/// Loads identifiers as image files relative to a root directory.
///
/// PNG, JPEG, GIF and WebP are decoded; animated formats yield their first
/// frame. Each load reads and decodes on its own thread and suspends until
/// that finishes, so a batch overlaps its file work.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, id: &ResourceId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

impl AssetSource for FileAssetSource {
    async fn load(&self, id: &ResourceId) -> Result<Option<ImageData>, AssetLoadFailure> {
        let path = self.resolve(id);
        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name(format!("asset {id}"))
            .spawn(move || {
                // The receiver is gone when the batch was dropped.
                let _ = tx.send(read_image(&path));
            })
            .map_err(|e| AssetLoadFailure::Failed(format!("cannot start loader for `{id}`: {e}")))?;

        rx.await
            .map_err(|_| AssetLoadFailure::Failed(format!("loader for `{id}` exited early")))?
    }
}

fn read_image(path: &Path) -> Result<Option<ImageData>, AssetLoadFailure> {
    let bytes = std::fs::read(path)
        .map_err(|e| AssetLoadFailure::Failed(format!("{}: {e}", path.display())))?;
    decode_image(&bytes)
}

/// Decodes encoded image bytes into straight-alpha RGBA8.
///
/// `Ok(None)` for a zero-sized image.
pub fn decode_image(bytes: &[u8]) -> Result<Option<ImageData>, AssetLoadFailure> {
    let decoded = image::load_from_memory(bytes).map_err(|e| match e {
        ImageError::Unsupported(u) => AssetLoadFailure::Unsupported(u.to_string()),
        other => AssetLoadFailure::Failed(other.to_string()),
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData::new(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLoader;
    use futures::executor::block_on;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba() {
        let image = decode_image(&png_bytes(3, 2)).expect("decodes").expect("non-empty");
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(&image.pixels()[..4], &[200, 10, 10, 255]);
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        let err = decode_image(b"definitely not an image").expect_err("must fail");
        assert!(matches!(err, AssetLoadFailure::Unsupported(_)), "{err:?}");
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let source = FileAssetSource::new(std::env::temp_dir().join("sandbox-scene-no-such-dir"));
        let err = block_on(source.load(&ResourceId::from("horse.png"))).expect_err("must fail");
        assert!(matches!(err, AssetLoadFailure::Failed(ref msg) if msg.contains("horse.png")));
    }

    #[test]
    fn reads_files_under_the_root() {
        let dir = std::env::temp_dir().join(format!("sandbox-scene-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("track.png"), png_bytes(4, 4)).expect("write png");

        let source = FileAssetSource::new(&dir);
        let image = block_on(source.load(&ResourceId::from("track.png")))
            .expect("loads")
            .expect("non-empty");
        assert_eq!(image.width(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn batch_of_files_settles_in_request_order() {
        let dir = std::env::temp_dir().join(format!("sandbox-scene-batch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("track.png"), png_bytes(8, 4)).expect("write png");
        std::fs::write(dir.join("horse.png"), png_bytes(2, 2)).expect("write png");
        std::fs::write(dir.join("notes.txt"), b"not an image").expect("write text");

        let loader = AssetLoader::new(FileAssetSource::new(&dir));
        let ids: Vec<ResourceId> = ["track.png", "missing.png", "notes.txt", "horse.png"]
            .into_iter()
            .map(ResourceId::from)
            .collect();
        let result = block_on(loader.load_all(&ids));

        let widths: Vec<Option<u32>> =
            result.iter().map(|o| o.drawable().map(|d| d.width())).collect();
        assert_eq!(widths, [Some(8), None, None, Some(2)]);
        assert!(matches!(result.get(2).map(|o| &o.result), Some(Err(AssetLoadFailure::Unsupported(_)))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
