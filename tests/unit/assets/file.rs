use super::*;
use crate::foundation::time::Timestamp;
use crate::scene::media::ImageItem;

fn temp_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("montage-file-resolver-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn rejects_escaping_references() {
    let r = FileAssetResolver::new("/tmp/assets");
    assert!(r.resolve_path("../secret.png").is_err());
    assert!(r.resolve_path("/etc/passwd").is_err());
    assert_eq!(
        r.resolve_path("img/a.png").unwrap(),
        PathBuf::from("/tmp/assets/img/a.png")
    );
}

#[tokio::test]
async fn decodes_and_caches_images() {
    let root = temp_root("img");
    let img = image::RgbaImage::from_raw(2, 1, vec![0, 255, 0, 255, 0, 0, 255, 255]).unwrap();
    img.save(root.join("g.png")).unwrap();

    let r = FileAssetResolver::new(&root);
    let item = MediaItem::Image(ImageItem {
        raster_ref: "g.png".into(),
        duration: Timestamp::seconds(1),
    });
    let f = r.frame(&item, Timestamp::ZERO).await.unwrap();
    assert_eq!(f.pixel(0, 0), [0, 255, 0, 255]);

    std::fs::remove_file(root.join("g.png")).unwrap();
    let again = r.frame(&item, Timestamp::seconds(1)).await.unwrap();
    assert_eq!(again, f);
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn missing_image_is_source_unavailable() {
    let r = FileAssetResolver::new(temp_root("missing"));
    let item = MediaItem::Image(ImageItem {
        raster_ref: "nope.png".into(),
        duration: Timestamp::seconds(1),
    });
    let err = r.frame(&item, Timestamp::ZERO).await.unwrap_err();
    assert!(matches!(err, MontageError::SourceUnavailable(_)));
}
