//! Wall ids for the coarse block map

/// Built-in wall IDs
pub struct WallId;

impl WallId {
    pub const NONE: u8 = 0;
    pub const WALLELEC: u8 = 1;
    pub const EWALL: u8 = 2;
    pub const DETECT: u8 = 3;
    pub const STREAM: u8 = 4;
    pub const FAN: u8 = 5;
    pub const ALLOWLIQUID: u8 = 6;
    pub const DESTROYALL: u8 = 7;
    pub const WALL: u8 = 8;
    pub const ALLOWAIR: u8 = 9;
    pub const ALLOWPOWDER: u8 = 10;
    pub const ALLOWALLELEC: u8 = 11;
    pub const EHOLE: u8 = 12;
    pub const ALLOWGAS: u8 = 13;
    pub const GRAV: u8 = 14;
    pub const ALLOWENERGY: u8 = 15;
    pub const BLOCKAIR: u8 = 16;
    pub const ERASEALL: u8 = 17;
    pub const STASIS: u8 = 18;
    /// Number of wall types
    pub const COUNT: u8 = 19;

    // Ids used by saves written before the wall renumbering
    pub const OLD_WALLELEC: u8 = 122;
    pub const OLD_EWALL: u8 = 123;
    pub const OLD_DETECT: u8 = 124;
    pub const OLD_STREAM: u8 = 125;
    pub const OLD_SIGN: u8 = 126;
    pub const OLD_FAN: u8 = 127;
    pub const OLD_ALLOWLIQUID: u8 = 128;
    pub const OLD_DESTROYALL: u8 = 129;
    pub const OLD_ERASE: u8 = 130;
    pub const OLD_WALL: u8 = 131;
    pub const OLD_ALLOWAIR: u8 = 132;
    pub const OLD_ALLOWSOLID: u8 = 133;
    pub const OLD_ALLOWALLELEC: u8 = 134;
    pub const OLD_EHOLE: u8 = 135;
    pub const OLD_ALLOWGAS: u8 = 140;
    pub const OLD_GRAV: u8 = 142;
    pub const OLD_ALLOWENERGY: u8 = 145;
    pub const OLD_FANHELPER: u8 = 255;
}

/// Translate a saved wall byte into a current wall id
///
/// Returns `None` for bytes that do not name a current wall (old sign
/// and eraser markers, unknown ids); those cells are skipped on load.
pub fn change_wallpp(saved: u8) -> Option<u8> {
    let wall = match saved {
        WallId::OLD_WALLELEC => WallId::WALLELEC,
        WallId::OLD_EWALL => WallId::EWALL,
        WallId::OLD_DETECT => WallId::DETECT,
        WallId::OLD_STREAM => WallId::STREAM,
        WallId::OLD_FAN => WallId::FAN,
        WallId::OLD_ALLOWLIQUID => WallId::ALLOWLIQUID,
        WallId::OLD_DESTROYALL => WallId::DESTROYALL,
        WallId::OLD_WALL => WallId::WALL,
        WallId::OLD_ALLOWAIR => WallId::ALLOWAIR,
        WallId::OLD_ALLOWSOLID => WallId::ALLOWPOWDER,
        WallId::OLD_ALLOWALLELEC => WallId::ALLOWALLELEC,
        WallId::OLD_EHOLE => WallId::EHOLE,
        WallId::OLD_ALLOWGAS => WallId::ALLOWGAS,
        WallId::OLD_GRAV => WallId::GRAV,
        WallId::OLD_ALLOWENERGY => WallId::ALLOWENERGY,
        other => other,
    };
    (wall < WallId::COUNT).then_some(wall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_wallpp_current_ids_pass_through() {
        for wall in 0..WallId::COUNT {
            assert_eq!(change_wallpp(wall), Some(wall));
        }
    }

    #[test]
    fn test_change_wallpp_old_ids() {
        assert_eq!(change_wallpp(WallId::OLD_WALL), Some(WallId::WALL));
        assert_eq!(change_wallpp(WallId::OLD_ALLOWSOLID), Some(WallId::ALLOWPOWDER));
        assert_eq!(change_wallpp(WallId::OLD_FAN), Some(WallId::FAN));
        assert_eq!(change_wallpp(WallId::OLD_ALLOWENERGY), Some(WallId::ALLOWENERGY));
    }

    #[test]
    fn test_change_wallpp_rejects_markers() {
        assert_eq!(change_wallpp(WallId::OLD_SIGN), None);
        assert_eq!(change_wallpp(WallId::OLD_ERASE), None);
        assert_eq!(change_wallpp(WallId::OLD_FANHELPER), None);
        assert_eq!(change_wallpp(WallId::COUNT), None);
    }
}
