use super::NutriscanApp;
use crate::classifier::ClassifiedResult;
use crate::decoder::{DecodedCode, ScanMode};
use crate::error::{NutriscanError, Result};
use crate::frame::FrameData;
use crate::scanner::{self, SessionReport};
use crate::source::{FacingMode, VideoSourceProvider};
use std::sync::Arc;
use tracing::info;

impl NutriscanApp {
    /// Decode one frame with every engine and classify the result
    pub async fn scan_frame(
        &self,
        frame: &FrameData,
        mode: ScanMode,
    ) -> Result<Option<(DecodedCode, ClassifiedResult)>> {
        let decoded = scanner::decode_still(
            self.engines.clone(),
            Some(Arc::clone(&self.event_bus)),
            frame,
            mode,
        )
        .await?;

        Ok(decoded.map(|code| {
            let classified = self.classifier.classify(&code);
            (code, classified)
        }))
    }

    /// Photo mode: decode a still image file
    #[cfg(feature = "images")]
    pub async fn scan_image(
        &self,
        path: &std::path::Path,
        mode: ScanMode,
    ) -> Result<Option<(DecodedCode, ClassifiedResult)>> {
        info!("Scanning {} in {} mode", path.display(), mode);

        let owned = path.to_path_buf();
        let frame = tokio::task::spawn_blocking(move || crate::source::load_frame(&owned, 0))
            .await
            .map_err(|e| NutriscanError::system(format!("Image loader task failed: {}", e)))??;

        self.scan_frame(&frame, mode).await
    }

    /// Run a live session until a code is found, Ctrl+C is pressed or the
    /// session fails. Failing to open the source is returned as an error.
    pub async fn run_live(
        &self,
        provider: Arc<dyn VideoSourceProvider>,
        mode: ScanMode,
        facing: FacingMode,
    ) -> Result<SessionReport> {
        let controller = self.controller(provider);
        let session_id = controller.start(mode, facing).await?;
        info!("Live scan {} running; press Ctrl+C to stop", session_id);

        let report = tokio::select! {
            report = controller.wait() => report,
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT signal (Ctrl+C)");
                controller.stop().await
            }
        };

        report.ok_or_else(|| NutriscanError::system("Scan session ended without a report"))
    }
}
