use super::router::EventRouter;
use crate::client::ProtocolClient;
use crate::files::write_private;
use log::{error, info};
use spowcore::mime;
use spowcore::types::message::{ImageMessage, MessageEvent};
use std::path::PathBuf;

impl<C: ProtocolClient> EventRouter<C> {
    pub(crate) async fn handle_message(&self, evt: MessageEvent) {
        info!(
            "Received message {} from {} ({}): {:?}",
            evt.info.id,
            evt.info.source.source_string(),
            evt.meta_summary(),
            evt.message
        );

        if evt.message.poll_update_message.is_some() {
            match self.client.decrypt_poll_vote(&evt).await {
                Ok(vote) => {
                    info!("Selected options in decrypted vote:");
                    for option in &vote.selected_options {
                        info!("- {}", hex::encode_upper(option));
                    }
                }
                Err(e) => error!("Failed to decrypt vote: {e}"),
            }
        } else if evt.message.enc_reaction_message.is_some() {
            match self.client.decrypt_reaction(&evt).await {
                Ok(reaction) => info!("Decrypted reaction: {reaction:?}"),
                Err(e) => error!("Failed to decrypt encrypted reaction: {e}"),
            }
        }

        if let Some(image) = &evt.message.image_message
            && let Some(path) = self.save_image(&evt.info.id, image).await
        {
            info!("Saved image in message to {}", path.display());
        }
    }

    /// Downloads the image and stores it as `<message id><extension>`.
    async fn save_image(&self, message_id: &str, image: &ImageMessage) -> Option<PathBuf> {
        let data = match self.client.download(image).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to download image: {e}");
                return None;
            }
        };

        let extension = mime::extension_for(image.mimetype.as_deref());
        let path = self.media_dir.join(format!("{message_id}{extension}"));
        let target = path.clone();
        match tokio::task::spawn_blocking(move || write_private(&target, &data)).await {
            Ok(Ok(())) => Some(path),
            Ok(Err(e)) => {
                error!("Failed to save image: {e}");
                None
            }
            Err(e) => {
                error!("Failed to save image: {e}");
                None
            }
        }
    }
}
