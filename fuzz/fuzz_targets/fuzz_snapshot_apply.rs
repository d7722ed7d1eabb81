#![no_main]

use libfuzzer_sys::fuzz_target;
use paddle_sync_client::inference::EventInference;
use paddle_sync_client::perspective::{Orientation, Perspective, TableGeometry};
use paddle_sync_client::protocol::ServerMessage;
use paddle_sync_client::snapshot::RoomSnapshot;

// Newline-separated server messages applied in order; projection and
// inference must accept whatever state results.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut snapshot = RoomSnapshot::new();
    let mut inference = EventInference::new();
    let geometry = TableGeometry::default();

    for line in text.lines() {
        let Ok(msg) = serde_json::from_str::<ServerMessage>(line) else {
            continue;
        };
        let changes = match msg {
            ServerMessage::Joined {
                session_id,
                room_id,
                state,
            } => snapshot.join(session_id, room_id, state),
            ServerMessage::PlayerAdded { session_id, player } => {
                snapshot.add_player(session_id, player)
            }
            ServerMessage::PlayerRemoved { session_id } => snapshot.remove_player(&session_id),
            ServerMessage::Patch(patch) => snapshot.apply_patch(patch),
            ServerMessage::JoinFailed { .. } | ServerMessage::Error { .. } => Vec::new(),
        };
        let _ = inference.observe(&changes, &snapshot);
        for anchor_local in [false, true] {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                let perspective = Perspective::new(orientation, anchor_local);
                let _ = perspective.project(&snapshot, &geometry, 0.1);
            }
        }
    }
});
