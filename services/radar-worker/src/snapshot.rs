//! PNG snapshots of published raster frames, for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use radar_pipeline::{FrameStore, PipelineEvent};
use renderer::RenderFrame;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// File name for a frame, e.g. `KTLX_94_20240506_220100.png`.
pub fn snapshot_name(site: &str, frame: &RenderFrame) -> String {
    format!(
        "{}_{}_{}.png",
        site,
        frame.header.product_code,
        frame.valid_time.format("%Y%m%d_%H%M%S")
    )
}

/// Write a frame as PNG. Mesh frames have no image and are skipped.
pub async fn write_snapshot(
    dir: &Path,
    site: &str,
    frame: &RenderFrame,
) -> Result<Option<PathBuf>> {
    let Some(image) = frame.geometry.as_raster() else {
        debug!(frame = %frame.id, "Mesh frame, no snapshot");
        return Ok(None);
    };

    let png = image.to_png()?;
    let path = dir.join(snapshot_name(site, frame));
    tokio::fs::write(&path, &png).await?;
    counter!("radar_snapshots_written_total").increment(1);
    info!(path = %path.display(), bytes = png.len(), "Wrote snapshot");
    Ok(Some(path))
}

/// Write a snapshot for every published frame until the event channel closes.
pub async fn run_snapshots(
    dir: PathBuf,
    store: Arc<FrameStore>,
    mut events: broadcast::Receiver<PipelineEvent>,
) {
    loop {
        match events.recv().await {
            Ok(PipelineEvent::Published { layer, frame, .. }) => {
                let Some(current) = store.current_frame(&layer) else {
                    continue;
                };
                // A newer frame may have landed already; it gets its own event.
                if current.id != frame {
                    continue;
                }
                if let Err(e) = write_snapshot(&dir, &layer.site, &current).await {
                    warn!(layer = %layer, error = %e, "Failed to write snapshot");
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Snapshot writer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use level3_parser::decode;
    use projection::Georeferencer;
    use radar_common::SiteInfo;
    use renderer::{build_frame, BuildOptions, GeometryKind, PaletteRegistry};
    use test_utils::level3::Level3Builder;

    fn frame(kind: GeometryKind) -> RenderFrame {
        let bytes = Level3Builder::new_digital()
            .with_uniform_levels(&[100; 20])
            .build();
        let georef =
            Georeferencer::new(&SiteInfo::new("KTLX", 35.3331, -97.2778, 370.0)).unwrap();
        let options = BuildOptions {
            force: Some(kind),
            ..Default::default()
        };
        build_frame(
            decode(&bytes).unwrap(),
            &georef,
            &PaletteRegistry::builtin().unwrap(),
            &options,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_raster_snapshot_written() {
        let dir = tempfile::tempdir().unwrap();
        let frame = frame(GeometryKind::Raster);

        let path = write_snapshot(dir.path(), "KTLX", &frame)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "KTLX_94_20240506_220100.png"
        );
        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_mesh_frame_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let frame = frame(GeometryKind::Mesh);
        let written = write_snapshot(dir.path(), "KTLX", &frame).await.unwrap();
        assert!(written.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
