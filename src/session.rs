//! Per-connection cube session
//!
//! Owns everything that is mutable for one connected cube: the Gen2 move
//! counter, the simulated cube state and the orientation history. One raw
//! notification goes in, zero or more [`CubeEvent`]s come out. Nothing here
//! blocks or performs I/O.

use crate::domain::cube_state::CubeState;
use crate::domain::events::{CubeEvent, FaceletsSnapshot};
use crate::domain::moves::Move;
use crate::domain::orientation::OrientationEngine;
use crate::domain::search::find_missed_moves;
use crate::domain::settings::Settings;
use crate::domain::tracker::{Advance, MoveCounterTracker};
use crate::error::CubeError;
use crate::infrastructure::bluetooth::decoder::{decode, OrientationReading, Packet};
use crate::infrastructure::bluetooth::{
    select_protocol, CubeCommand, DeviceIdentity, PacketCipher, ProtocolGeneration,
};
use tracing::{debug, info, warn};

/// Behaviour switches for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Compare snapshots against the simulated state
    pub reconcile_snapshots: bool,
    /// Run the missed-move search when a snapshot disagrees
    pub search_missed_moves: bool,
    /// Ask for a facelets snapshot as part of the connect commands
    pub request_facelets_on_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconcile_snapshots: true,
            search_missed_moves: true,
            request_facelets_on_connect: true,
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            reconcile_snapshots: settings.reconcile_snapshots,
            search_missed_moves: settings.search_missed_moves,
            request_facelets_on_connect: settings.request_facelets_on_connect,
        }
    }
}

pub struct CubeSession {
    generation: ProtocolGeneration,
    device: DeviceIdentity,
    cipher: Box<dyn PacketCipher>,
    config: SessionConfig,

    tracker: MoveCounterTracker,
    simulated: CubeState,
    /// A snapshot (or reset) has anchored the simulated state
    synced: bool,
    orientation: OrientationEngine,
}

impl CubeSession {
    pub fn new(
        generation: ProtocolGeneration,
        device: DeviceIdentity,
        cipher: Box<dyn PacketCipher>,
        config: SessionConfig,
    ) -> Self {
        info!("Starting {} session for {}", generation, device);
        Self {
            generation,
            device,
            cipher,
            config,
            tracker: MoveCounterTracker::new(),
            simulated: CubeState::solved(),
            synced: false,
            orientation: OrientationEngine::new(),
        }
    }

    /// Select the protocol from the device's characteristics and start a
    /// session. Unsupported devices are reported, not retried.
    pub fn connect<S: AsRef<str>>(
        characteristics: &[S],
        device: DeviceIdentity,
        cipher: Box<dyn PacketCipher>,
        config: SessionConfig,
    ) -> Result<Self, CubeError> {
        let generation = select_protocol(characteristics)?;
        Ok(Self::new(generation, device, cipher, config))
    }

    pub fn generation(&self) -> ProtocolGeneration {
        self.generation
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub fn simulated_state(&self) -> &CubeState {
        &self.simulated
    }

    pub fn tracker(&self) -> &MoveCounterTracker {
        &self.tracker
    }

    pub fn orientation(&self) -> &OrientationEngine {
        &self.orientation
    }

    /// Forget all per-connection state, as after a reconnect
    pub fn reset(&mut self) {
        debug!("Resetting session state for {}", self.device);
        self.tracker.reset();
        self.simulated = CubeState::solved();
        self.synced = false;
        self.orientation.reset();
    }

    /// Encrypted bytes for `command`, ready for the write characteristic
    pub fn command(&mut self, command: CubeCommand) -> Result<Vec<u8>, CubeError> {
        let plaintext = command.payload(self.generation);
        let ciphertext = self.cipher.encrypt(&plaintext, &self.device)?;

        if command == CubeCommand::ResetState {
            info!("Cube state reset to solved");
            self.simulated = CubeState::solved();
            self.synced = true;
        }
        Ok(ciphertext)
    }

    /// Commands to send right after subscribing to notifications
    pub fn connect_commands(&mut self) -> Result<Vec<Vec<u8>>, CubeError> {
        let mut commands = Vec::new();
        if self.config.request_facelets_on_connect {
            commands.push(self.command(CubeCommand::RequestFacelets)?);
        }
        Ok(commands)
    }

    /// Handle one encrypted notification
    pub fn handle_notification(&mut self, ciphertext: &[u8]) -> Vec<CubeEvent> {
        match self.cipher.decrypt(ciphertext, &self.device) {
            Ok(plaintext) => self.handle_plaintext(&plaintext),
            Err(e) => {
                warn!("Dropping notification that failed to decrypt: {}", e);
                Vec::new()
            }
        }
    }

    /// Handle one already decrypted notification
    pub fn handle_plaintext(&mut self, payload: &[u8]) -> Vec<CubeEvent> {
        let packet = match decode(self.generation, payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping malformed {} packet: {}", self.generation, e);
                return Vec::new();
            }
        };

        match packet {
            Packet::Move(mv) => {
                self.apply_moves(std::slice::from_ref(&mv));
                vec![CubeEvent::Move(mv)]
            }
            Packet::MoveSlots(batch) => match self.tracker.advance(batch.counter) {
                Advance::Uninitialized => {
                    debug!(
                        "Ignoring move batch {} until a snapshot seeds the counter",
                        batch.counter
                    );
                    Vec::new()
                }
                Advance::Pending { count: 0, .. } => {
                    warn!("Move batch {} carries no new moves", batch.counter);
                    Vec::new()
                }
                Advance::Pending { count, overflowed } => {
                    if overflowed {
                        warn!("More than {} moves since last batch, some were lost", count);
                    }
                    let moves = batch.resolve(count);
                    if moves.is_empty() {
                        return Vec::new();
                    }
                    self.apply_moves(&moves);
                    vec![CubeEvent::MoveBatch { moves }]
                }
            },
            Packet::Facelets(snapshot) => self.on_snapshot(snapshot),
            Packet::Orientation(reading) => vec![self.on_orientation(reading)],
            Packet::Unknown { tag } => {
                debug!("Unknown {} packet tag {:#04X}", self.generation, tag);
                vec![CubeEvent::Unknown { raw_tag: tag }]
            }
        }
    }

    fn apply_moves(&mut self, moves: &[Move]) {
        self.simulated.apply_all(moves);
        debug!(
            "Moves: {}",
            moves
                .iter()
                .map(Move::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    fn on_orientation(&mut self, reading: OrientationReading) -> CubeEvent {
        let (absolute, relative) = self.orientation.push(reading.quaternion());
        CubeEvent::OrientationSample {
            absolute,
            relative,
            velocity: reading.velocity(),
        }
    }

    fn on_snapshot(&mut self, snapshot: FaceletsSnapshot) -> Vec<CubeEvent> {
        if self.generation == ProtocolGeneration::Gen2 {
            // The counter seeds move tracking even if the piece data is bad
            self.tracker.seed(snapshot.serial as u8);
            debug!("Move counter seeded at {}", snapshot.serial);
        }

        if let Err(e) = snapshot.state.validate() {
            warn!("Ignoring snapshot {} with invalid state: {}", snapshot.serial, e);
            return Vec::new();
        }

        let mut events = vec![CubeEvent::FaceletsSnapshot(snapshot.clone())];

        if self.synced && self.config.reconcile_snapshots && self.simulated != snapshot.state {
            let likely_missed = if self.config.search_missed_moves {
                find_missed_moves(&self.simulated, &snapshot.state)
            } else {
                None
            };
            warn!(
                "Simulated state disagrees with snapshot {} (likely missed: {:?})",
                snapshot.serial, likely_missed
            );
            events.push(CubeEvent::ReconciliationWarning {
                expected: self.simulated.clone(),
                actual: snapshot.state.clone(),
                likely_missed,
            });
        }

        self.simulated = snapshot.state;
        self.synced = true;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::moves::{parse_formula, Face, Modifier};
    use crate::error::CipherError;
    use crate::infrastructure::bluetooth::decoder::test_support::BitWriter;
    use crate::infrastructure::bluetooth::{gen2, gen4, PlaintextCipher};

    fn session(generation: ProtocolGeneration) -> CubeSession {
        CubeSession::new(
            generation,
            DeviceIdentity([0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03]),
            Box::new(PlaintextCipher),
            SessionConfig::default(),
        )
    }

    fn gen2_snapshot(counter: u8, state: &CubeState) -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.put(0, 4, gen2::TAG_FACELETS as u32).put(4, 8, counter as u32);
        w.put_state(&gen2::SNAPSHOT_LAYOUT, state);
        w.bytes
    }

    /// `newest_first` in notation; "-" marks a corrupted slot
    fn gen2_moves(counter: u8, newest_first: &[&str]) -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.put(0, 4, gen2::TAG_MOVE as u32).put(4, 8, counter as u32);
        for (i, token) in newest_first.iter().enumerate() {
            let (face, ccw) = match token.parse::<Move>() {
                Ok(mv) => (
                    Face::ALL.iter().position(|f| *f == mv.face).unwrap() as u32,
                    mv.modifier == Modifier::CounterClockwise,
                ),
                Err(_) => (6, false),
            };
            w.put(12 + 5 * i, 4, face).put(16 + 5 * i, 1, ccw as u32);
        }
        w.bytes
    }

    fn gen4_snapshot(serial: u16, state: &CubeState) -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.put(0, 8, gen4::TAG_FACELETS as u32)
            .put(16, 16, serial.swap_bytes() as u32);
        w.put_state(&gen4::SNAPSHOT_LAYOUT, state);
        w.bytes
    }

    fn gen4_move(position: usize, ccw: bool) -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.put(0, 8, gen4::TAG_MOVE as u32)
            .put(64, 2, ccw as u32)
            .put(66, 6, 0b100000 >> position);
        w.bytes
    }

    fn all_moves(events: &[CubeEvent]) -> Vec<Move> {
        events.iter().flat_map(|e| e.moves().to_vec()).collect()
    }

    #[test]
    fn test_gen4_move_updates_simulation() {
        let mut s = session(ProtocolGeneration::Gen4);
        // position 0 -> R
        let events = s.handle_plaintext(&gen4_move(0, false));
        assert_eq!(events, vec![CubeEvent::Move(Move::clockwise(Face::R))]);

        let mut expected = CubeState::solved();
        expected.apply_formula("R").unwrap();
        assert_eq!(s.simulated_state(), &expected);
    }

    #[test]
    fn test_gen2_batch_before_seed_is_ignored() {
        let mut s = session(ProtocolGeneration::Gen2);
        assert!(s.handle_plaintext(&gen2_moves(5, &["R"])).is_empty());
        assert!(!s.tracker().is_seeded());
    }

    #[test]
    fn test_gen2_batches_after_seed() {
        let mut s = session(ProtocolGeneration::Gen2);
        let events = s.handle_plaintext(&gen2_snapshot(10, &CubeState::solved()));
        assert!(matches!(events[0], CubeEvent::FaceletsSnapshot(_)));
        assert_eq!(s.tracker().last_seen(), Some(10));

        // Two new moves: U then R' (newest first on the wire)
        let events = s.handle_plaintext(&gen2_moves(12, &["R'", "U", "F", "B"]));
        assert_eq!(all_moves(&events), parse_formula("U R'").unwrap());

        // Same counter again: nothing new
        assert!(s.handle_plaintext(&gen2_moves(12, &["R'", "U"])).is_empty());

        // One more; older slots repeat history
        let events = s.handle_plaintext(&gen2_moves(13, &["D", "R'", "U"]));
        assert_eq!(all_moves(&events), parse_formula("D").unwrap());
    }

    #[test]
    fn test_gen2_wraparound_clamps_to_capacity() {
        let mut s = session(ProtocolGeneration::Gen2);
        s.handle_plaintext(&gen2_snapshot(250, &CubeState::solved()));

        let newest_first = ["U", "R", "F", "D", "L", "B", "U'"];
        let events = s.handle_plaintext(&gen2_moves(3, &newest_first));
        assert_eq!(
            all_moves(&events),
            parse_formula("U' B L D F R U").unwrap()
        );
        assert_eq!(s.tracker().last_seen(), Some(3));
    }

    #[test]
    fn test_gen2_corrupted_slot_skipped() {
        let mut s = session(ProtocolGeneration::Gen2);
        s.handle_plaintext(&gen2_snapshot(0, &CubeState::solved()));

        let events = s.handle_plaintext(&gen2_moves(3, &["F", "-", "L'"]));
        assert_eq!(all_moves(&events), parse_formula("L' F").unwrap());
    }

    #[test]
    fn test_snapshot_reconciliation() {
        let mut s = session(ProtocolGeneration::Gen4);

        // Baseline: no comparison
        let events = s.handle_plaintext(&gen4_snapshot(1, &CubeState::solved()));
        assert_eq!(events.len(), 1);

        // Cube reports an R turn that never arrived as a move event
        let mut turned = CubeState::solved();
        turned.apply_formula("R").unwrap();
        let events = s.handle_plaintext(&gen4_snapshot(2, &turned));
        assert_eq!(events.len(), 2);
        match &events[1] {
            CubeEvent::ReconciliationWarning {
                expected,
                actual,
                likely_missed,
            } => {
                assert!(expected.is_solved());
                assert_eq!(actual, &turned);
                assert_eq!(likely_missed.as_deref(), Some(&parse_formula("R").unwrap()[..]));
            }
            other => panic!("expected reconciliation warning, got {:?}", other),
        }
        assert_eq!(s.simulated_state(), &turned);
    }

    #[test]
    fn test_snapshot_matching_simulation() {
        let mut s = session(ProtocolGeneration::Gen4);
        s.handle_plaintext(&gen4_snapshot(1, &CubeState::solved()));
        s.handle_plaintext(&gen4_move(0, false));

        let mut turned = CubeState::solved();
        turned.apply_formula("R").unwrap();
        let events = s.handle_plaintext(&gen4_snapshot(2, &turned));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reconciliation_disabled() {
        let mut settings = Settings::default();
        settings.reconcile_snapshots = false;
        let mut s = CubeSession::new(
            ProtocolGeneration::Gen4,
            DeviceIdentity([0; 6]),
            Box::new(PlaintextCipher),
            SessionConfig::from(&settings),
        );
        s.handle_plaintext(&gen4_snapshot(1, &CubeState::solved()));

        let mut turned = CubeState::solved();
        turned.apply_formula("U'").unwrap();
        assert_eq!(s.handle_plaintext(&gen4_snapshot(2, &turned)).len(), 1);
        assert_eq!(s.simulated_state(), &turned);
    }

    #[test]
    fn test_missed_move_search_disabled() {
        let mut settings = Settings::default();
        settings.search_missed_moves = false;
        let mut s = CubeSession::new(
            ProtocolGeneration::Gen4,
            DeviceIdentity([0; 6]),
            Box::new(PlaintextCipher),
            SessionConfig::from(&settings),
        );
        s.handle_plaintext(&gen4_snapshot(1, &CubeState::solved()));

        let mut turned = CubeState::solved();
        turned.apply_formula("R").unwrap();
        let events = s.handle_plaintext(&gen4_snapshot(2, &turned));
        assert!(matches!(
            events.as_slice(),
            [
                CubeEvent::FaceletsSnapshot(_),
                CubeEvent::ReconciliationWarning { likely_missed: None, .. }
            ]
        ));
        assert_eq!(s.simulated_state(), &turned);
    }

    #[test]
    fn test_notification_through_cipher() {
        let mut s = session(ProtocolGeneration::Gen4);
        // position 4 -> U, counter-clockwise
        let events = s.handle_notification(&gen4_move(4, true));
        assert_eq!(events, vec![CubeEvent::Move(Move::counter_clockwise(Face::U))]);

        let mut expected = CubeState::solved();
        expected.apply_formula("U'").unwrap();
        assert_eq!(s.simulated_state(), &expected);
    }

    #[test]
    fn test_invalid_snapshot_not_adopted() {
        let mut s = session(ProtocolGeneration::Gen2);
        let mut bad = BitWriter::new(20);
        bad.put(0, 4, gen2::TAG_FACELETS as u32).put(4, 8, 7);
        assert!(s.handle_plaintext(&bad.bytes).is_empty());
        // Counter still seeded, state untouched
        assert_eq!(s.tracker().last_seen(), Some(7));
        assert!(s.simulated_state().is_solved());
    }

    #[test]
    fn test_malformed_packets_are_dropped() {
        let mut s = session(ProtocolGeneration::Gen4);
        let mut no_face = [0u8; 20];
        no_face[0] = gen4::TAG_MOVE;
        assert!(s.handle_plaintext(&no_face).is_empty());
        assert!(s.handle_plaintext(&[0x01, 0x00]).is_empty());

        // Session keeps working afterwards
        assert_eq!(s.handle_plaintext(&gen4_move(4, true)).len(), 1);
    }

    #[test]
    fn test_all_zero_payloads() {
        for generation in ProtocolGeneration::ALL {
            let mut s = session(generation);
            let events = s.handle_plaintext(&[0u8; 20]);
            assert!(
                matches!(events.as_slice(), [CubeEvent::Unknown { raw_tag: 0 }]),
                "{}: {:?}",
                generation,
                events
            );
        }
    }

    #[test]
    fn test_orientation_event() {
        let mut s = session(ProtocolGeneration::Gen4);
        let mut w = BitWriter::new(20);
        w.put(0, 8, gen4::TAG_GYRO as u32)
            .put(16, 16, 0)
            .put(32, 16, 0x7FFF)
            .put(48, 16, 0)
            .put(64, 16, 0);
        match s.handle_plaintext(&w.bytes).as_slice() {
            [CubeEvent::OrientationSample { relative, .. }] => {
                assert_eq!((relative.w, relative.x, relative.y, relative.z), (0.0, 1.0, 0.0, 0.0));
            }
            other => panic!("expected orientation sample, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_selects_protocol() {
        let s = CubeSession::connect(
            &["8653000b-43e6-47b7-9cb0-5fc21d4ae340"],
            DeviceIdentity([0; 6]),
            Box::new(PlaintextCipher),
            SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(s.generation(), ProtocolGeneration::Gen3);

        let err = CubeSession::connect(
            &["00002a00-0000-1000-8000-00805f9b34fb"],
            DeviceIdentity([0; 6]),
            Box::new(PlaintextCipher),
            SessionConfig::default(),
        );
        assert!(matches!(err, Err(CubeError::UnsupportedProtocol(1))));
    }

    #[test]
    fn test_commands() {
        let mut s = session(ProtocolGeneration::Gen4);
        s.handle_plaintext(&gen4_move(0, false));

        let commands = s.connect_commands().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0][0], 0xDD);

        let reset = s.command(CubeCommand::ResetState).unwrap();
        assert_eq!(reset[0], 0xD2);
        assert!(s.simulated_state().is_solved());
    }

    struct BrokenCipher;

    impl PacketCipher for BrokenCipher {
        fn decrypt(&self, c: &[u8], _: &DeviceIdentity) -> Result<Vec<u8>, CipherError> {
            Err(CipherError::InvalidLength(c.len()))
        }

        fn encrypt(&self, p: &[u8], _: &DeviceIdentity) -> Result<Vec<u8>, CipherError> {
            Err(CipherError::InvalidLength(p.len()))
        }
    }

    #[test]
    fn test_cipher_failures() {
        let mut s = CubeSession::new(
            ProtocolGeneration::Gen2,
            DeviceIdentity([0; 6]),
            Box::new(BrokenCipher),
            SessionConfig::default(),
        );
        assert!(s.handle_notification(&[0u8; 20]).is_empty());
        assert!(matches!(
            s.command(CubeCommand::RequestFacelets),
            Err(CubeError::Cipher(CipherError::InvalidLength(20)))
        ));
    }

    #[test]
    fn test_reset_clears_connection_state() {
        let mut s = session(ProtocolGeneration::Gen2);
        s.handle_plaintext(&gen2_snapshot(4, &CubeState::solved()));
        s.handle_plaintext(&gen2_moves(5, &["R"]));
        s.reset();
        assert!(!s.tracker().is_seeded());
        assert!(s.simulated_state().is_solved());
    }
}
