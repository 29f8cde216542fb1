//! Session-scoped fusion state.

use tagfuse_types::Pose2d;

/// Whether localization has been seeded from vision this session, and the
/// last pose vision produced.
///
/// Owned and mutated only by the fusion engine. `last_accepted_pose` is kept
/// for diagnostics and is never fed back into fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FusionState {
    pose_seeded: bool,
    last_accepted_pose: Option<Pose2d>,
}

impl FusionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose_seeded(&self) -> bool {
        self.pose_seeded
    }

    pub fn last_accepted_pose(&self) -> Option<Pose2d> {
        self.last_accepted_pose
    }

    /// Mark the session seeded from `pose`.
    pub(crate) fn seed(&mut self, pose: Pose2d) {
        self.pose_seeded = true;
        self.last_accepted_pose = Some(pose);
    }

    pub(crate) fn record_fused(&mut self, pose: Pose2d) {
        self.last_accepted_pose = Some(pose);
    }

    /// Return to the unseeded state. `last_accepted_pose` survives so the
    /// dashboard keeps showing where vision last put the robot.
    pub(crate) fn unseed(&mut self) {
        self.pose_seeded = false;
    }
}
