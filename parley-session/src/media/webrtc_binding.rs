use crate::media::{MediaBinding, MediaConfig, MediaEvent, MediaFactory};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use parley_core::{IceCandidate, SdpKind, SessionDescription, SessionKey};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// [`MediaBinding`] backed by a `webrtc` peer connection.
///
/// The peer connection only exists between `acquire_local_media` and `release`,
/// so a declined call never touches the network stack.
pub struct WebRtcMediaBinding {
    key: SessionKey,
    config: MediaConfig,
    event_tx: mpsc::Sender<MediaEvent>,
    peer_connection: Option<Arc<RTCPeerConnection>>,
    local_tracks: Vec<Arc<TrackLocalStaticSample>>,
}

impl WebRtcMediaBinding {
    pub fn new(key: SessionKey, config: MediaConfig, event_tx: mpsc::Sender<MediaEvent>) -> Self {
        Self {
            key,
            config,
            event_tx,
            peer_connection: None,
            local_tracks: Vec::new(),
        }
    }

    /// Factory for [`CallManager`](crate::CallManager) producing one binding per call.
    pub fn factory(config: MediaConfig) -> Arc<MediaFactory> {
        Arc::new(move |key: &SessionKey, event_tx: mpsc::Sender<MediaEvent>| {
            Box::new(WebRtcMediaBinding::new(key.clone(), config.clone(), event_tx))
                as Box<dyn MediaBinding>
        })
    }

    /// Tracks fed by the local capture pipeline (writes go through `write_sample`).
    pub fn local_tracks(&self) -> &[Arc<TrackLocalStaticSample>] {
        &self.local_tracks
    }

    fn connection(&self) -> Result<&Arc<RTCPeerConnection>> {
        self.peer_connection
            .as_ref()
            .context("local media has not been acquired")
    }

    async fn build_peer_connection(&self) -> Result<Arc<RTCPeerConnection>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: self
                .config
                .ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = self.event_tx.clone();
        let key_state = self.key.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let key = key_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", key, s);
                    let event = match s {
                        RTCPeerConnectionState::Connected => MediaEvent::ConnectivityEstablished,
                        RTCPeerConnectionState::Failed => {
                            MediaEvent::ConnectivityFailed("peer connection failed".to_owned())
                        }
                        _ => return,
                    };
                    let _ = tx.send(event).await;
                })
            },
        ));

        let ice_tx = self.event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(MediaEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let key_track = self.key.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let key = key_track.clone();
                Box::pin(async move {
                    info!(
                        "Remote {} track '{}' from {}",
                        track.kind(),
                        track.id(),
                        key.remote
                    );
                })
            },
        ));

        Ok(peer_connection)
    }

    fn local_track(mime_type: &str, id: &str) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.to_owned(),
            "parley".to_owned(),
        ))
    }
}

fn to_rtc_description(description: &SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(description.sdp.clone())?,
        SdpKind::Answer => RTCSessionDescription::answer(description.sdp.clone())?,
    };
    Ok(desc)
}

#[async_trait]
impl MediaBinding for WebRtcMediaBinding {
    async fn acquire_local_media(&mut self) -> Result<()> {
        if self.peer_connection.is_some() {
            bail!("local media already acquired for {}", self.key);
        }

        let peer_connection = self.build_peer_connection().await?;

        let mut tracks = Vec::new();
        if self.config.audio {
            tracks.push(Self::local_track(MIME_TYPE_OPUS, "audio"));
        }
        if self.config.video {
            tracks.push(Self::local_track(MIME_TYPE_VP8, "video"));
        }
        for track in &tracks {
            let local: Arc<dyn TrackLocal + Send + Sync> = track.clone();
            peer_connection
                .add_track(local)
                .await
                .context("Failed to attach local track")?;
        }

        debug!("Attached {} local tracks for {}", tracks.len(), self.key);
        self.local_tracks = tracks;
        self.peer_connection = Some(peer_connection);
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription> {
        let pc = self.connection()?;
        let offer = pc.create_offer(None).await?;
        pc.set_local_description(offer.clone()).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&mut self, remote: &SessionDescription) -> Result<SessionDescription> {
        let pc = self.connection()?;
        if pc.remote_description().await.is_none() {
            pc.set_remote_description(to_rtc_description(remote)?)
                .await?;
        }
        let answer = pc.create_answer(None).await?;
        pc.set_local_description(answer.clone()).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn apply_remote_description(&mut self, description: &SessionDescription) -> Result<()> {
        let pc = self.connection()?;
        pc.set_remote_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn apply_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
        let pc = self.connection()?;
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment.clone(),
        };
        pc.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn release(&mut self) {
        self.local_tracks.clear();
        let Some(pc) = self.peer_connection.take() else {
            return;
        };
        if let Err(e) = pc.close().await {
            warn!("Failed to close peer connection for {}: {:?}", self.key, e);
        }
    }
}
