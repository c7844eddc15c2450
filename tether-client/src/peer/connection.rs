use crate::error::{Error, Result};
use crate::peer::{CallbackSlot, CandidateDisposition, CandidateQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tether_core::{ConnectionState, IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

type StateCallback = dyn Fn(ConnectionState) + Send + Sync;
type CandidateCallback = dyn Fn(IceCandidate) + Send + Sync;
type DataChannelCallback = dyn Fn(Arc<RTCDataChannel>) + Send + Sync;
type TrackCallback = dyn Fn(Arc<TrackRemote>) + Send + Sync;

#[derive(Default)]
struct Callbacks {
    state: CallbackSlot<StateCallback>,
    candidate: CallbackSlot<CandidateCallback>,
    data_channel: CallbackSlot<DataChannelCallback>,
    track: CallbackSlot<TrackCallback>,
}

impl Callbacks {
    fn clear(&self) {
        self.state.clear();
        self.candidate.clear();
        self.data_channel.clear();
        self.track.clear();
    }
}

/// Last observed link state, only moved along legal transitions.
struct StateTracker {
    current: Mutex<ConnectionState>,
}

impl StateTracker {
    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> ConnectionState {
        *self.lock()
    }

    fn advance(&self, next: ConnectionState) -> bool {
        let mut current = self.lock();
        if current.accepts(next) {
            *current = next;
            true
        } else {
            false
        }
    }
}

/// A track placed on the connection by [`PeerConnection::attach_track`].
pub struct TrackAttachment {
    peer_connection: Weak<RTCPeerConnection>,
    sender: Arc<RTCRtpSender>,
    rtcp_reader: JoinHandle<()>,
}

impl TrackAttachment {
    /// Takes the track off the connection. A no-op once the connection is gone.
    pub async fn detach(self) -> Result<()> {
        self.rtcp_reader.abort();
        let Some(pc) = self.peer_connection.upgrade() else {
            return Ok(());
        };
        pc.remove_track(&self.sender).await?;
        Ok(())
    }
}

/// One negotiated peer link: state, trickle ICE, descriptions and the
/// attachment points for media and the single data channel.
pub struct PeerConnection {
    pc: Arc<RTCPeerConnection>,
    callbacks: Arc<Callbacks>,
    state: Arc<StateTracker>,
    candidates: tokio::sync::Mutex<CandidateQueue>,
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    closed: AtomicBool,
}

impl PeerConnection {
    pub async fn new(ice_servers: &[IceServerConfig]) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);
        let connection = Self {
            pc,
            callbacks: Arc::new(Callbacks::default()),
            state: Arc::new(StateTracker {
                current: Mutex::new(ConnectionState::New),
            }),
            candidates: tokio::sync::Mutex::new(CandidateQueue::default()),
            data_channel: Arc::new(Mutex::new(None)),
            closed: AtomicBool::new(false),
        };
        connection.wire_events();
        Ok(connection)
    }

    fn wire_events(&self) {
        let callbacks = self.callbacks.clone();
        let tracker = self.state.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let callbacks = callbacks.clone();
                let tracker = tracker.clone();
                Box::pin(async move {
                    let Some(next) = map_state(s) else { return };
                    if !tracker.advance(next) {
                        debug!("Ignoring peer state {} after {}", next, tracker.get());
                        return;
                    }
                    info!("Peer connection state changed: {}", next);
                    if let Some(callback) = callbacks.state.get() {
                        callback(next);
                    }
                })
            }));

        let callbacks = self.callbacks.clone();
        self.pc
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let callbacks = callbacks.clone();
                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    let Ok(init) = candidate.to_json() else {
                        return;
                    };
                    debug!("Local ICE candidate gathered");
                    if let Some(callback) = callbacks.candidate.get() {
                        callback(from_init(init));
                    }
                })
            }));

        let callbacks = self.callbacks.clone();
        let slot = self.data_channel.clone();
        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                let callbacks = callbacks.clone();
                let slot = slot.clone();
                Box::pin(async move {
                    {
                        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
                        if current.is_some() {
                            warn!("Ignoring extra data channel '{}'", dc.label());
                            return;
                        }
                        *current = Some(dc.clone());
                    }
                    debug!("Remote data channel '{}' announced", dc.label());
                    if let Some(callback) = callbacks.data_channel.get() {
                        callback(dc);
                    }
                })
            }));

        let callbacks = self.callbacks.clone();
        self.pc
            .on_track(Box::new(move |track, _receiver, _transceiver| {
                let callbacks = callbacks.clone();
                Box::pin(async move {
                    info!(
                        "Remote track arrived: kind={}, codec={}",
                        track.kind(),
                        track.codec().capability.mime_type
                    );
                    if let Some(callback) = callbacks.track.get() {
                        callback(track);
                    }
                })
            }));
    }

    /// Replaces the state-change callback.
    pub fn on_state_change(&self, callback: impl Fn(ConnectionState) + Send + Sync + 'static) {
        self.callbacks.state.set(Arc::new(callback));
    }

    /// Replaces the callback receiving each locally gathered candidate.
    pub fn on_local_candidate(&self, callback: impl Fn(IceCandidate) + Send + Sync + 'static) {
        self.callbacks.candidate.set(Arc::new(callback));
    }

    /// Replaces the callback for a data channel opened by the remote side.
    /// Fires at most once per connection.
    pub fn on_data_channel(&self, callback: impl Fn(Arc<RTCDataChannel>) + Send + Sync + 'static) {
        self.callbacks.data_channel.set(Arc::new(callback));
    }

    pub fn on_track(&self, callback: impl Fn(Arc<TrackRemote>) + Send + Sync + 'static) {
        self.callbacks.track.set(Arc::new(callback));
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    pub async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.pc.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    pub async fn set_local_description(&self, desc: &SessionDescription) -> Result<()> {
        self.pc.set_local_description(to_rtc(desc)?).await?;
        debug!("Local {:?} applied", desc.kind);
        Ok(())
    }

    /// Applies the remote description, then any candidates queued ahead of
    /// it. Returns how many queued candidates were applied.
    pub async fn set_remote_description(&self, desc: &SessionDescription) -> Result<usize> {
        let mut queue = self.candidates.lock().await;
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        debug!("Remote {:?} applied", desc.kind);

        let pending = queue.release();
        let mut applied = 0;
        for candidate in pending {
            match self.pc.add_ice_candidate(to_init(candidate)).await {
                Ok(()) => applied += 1,
                Err(e) => warn!("Dropping queued candidate: {}", e),
            }
        }
        Ok(applied)
    }

    pub async fn add_remote_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition> {
        let mut queue = self.candidates.lock().await;
        match queue.offer(candidate) {
            None => {
                debug!("Queued remote candidate ({} pending)", queue.len());
                Ok(CandidateDisposition::Queued)
            }
            Some(candidate) => {
                self.pc.add_ice_candidate(to_init(candidate)).await?;
                Ok(CandidateDisposition::Applied)
            }
        }
    }

    pub async fn queued_candidates(&self) -> usize {
        self.candidates.lock().await.len()
    }

    /// Opens the connection's only data channel, ordered and reliable.
    pub async fn create_data_channel(&self, label: &str) -> Result<Arc<RTCDataChannel>> {
        if self.data_channel().is_some() {
            return Err(Error::Negotiation("data channel already exists".into()));
        }
        let dc = self
            .pc
            .create_data_channel(
                label,
                Some(RTCDataChannelInit {
                    ordered: Some(true),
                    ..Default::default()
                }),
            )
            .await?;
        *self.data_channel_slot() = Some(dc.clone());
        Ok(dc)
    }

    pub fn data_channel(&self) -> Option<Arc<RTCDataChannel>> {
        self.data_channel_slot().clone()
    }

    /// Adds a receive-only video m-line so an answerer has somewhere to put
    /// its track.
    pub async fn add_video_receiver(&self) -> Result<()> {
        self.pc
            .add_transceiver_from_kind(
                RTPCodecType::Video,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn attach_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<TrackAttachment> {
        if self.is_closed() {
            return Err(Error::PeerState(ConnectionState::Closed));
        }
        let sender = self.pc.add_track(track).await?;

        // RTCP has to be drained for interceptors to work.
        let reader = sender.clone();
        let rtcp_reader = tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while reader.read(&mut buf).await.is_ok() {}
        });

        Ok(TrackAttachment {
            peer_connection: Arc::downgrade(&self.pc),
            sender,
            rtcp_reader,
        })
    }

    /// Number of senders currently carrying a track.
    pub async fn attached_track_count(&self) -> usize {
        let mut count = 0;
        for sender in self.pc.get_senders().await {
            if sender.track().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Releases the data channel and the underlying connection. Safe to call
    /// more than once.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let dc = self.data_channel_slot().take();
        if let Some(dc) = dc
            && let Err(e) = dc.close().await
        {
            debug!("Data channel close: {}", e);
        }
        let result = self.pc.close().await;
        self.callbacks.clear();
        info!("Peer connection closed");
        result.map_err(Error::from)
    }

    fn data_channel_slot(&self) -> MutexGuard<'_, Option<Arc<RTCDataChannel>>> {
        self.data_channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn map_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

fn to_rtc(desc: &SessionDescription) -> Result<RTCSessionDescription> {
    let sdp = desc.sdp.clone();
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp)?,
        SdpKind::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            rollback
        }
    };
    Ok(rtc)
}

fn to_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
