//! AMR gain quantizer tables and the fixed-codebook gain predictor.
//!
//! The decoder predicts each subframe's fixed-codebook gain from a moving
//! average of the four previous quantization energies, then scales the
//! prediction by a correction factor looked up from the frame's gain
//! index. Running just that stage is enough to rank subframe loudness
//! without synthesizing any speech.
//!
//! Energy values are Q10 dB relative to the codebook norm; correction
//! factors and predictions stay in the codec's fixed-point scales.

/// Payload size in bytes for each of the 16 frame types, not counting the
/// frame-type header byte. Zero-size entries cover the reserved types and
/// let the parser skip frames it cannot size.
pub const BLOCK_SIZES: [usize; 16] = [12, 13, 15, 17, 19, 20, 26, 31, 5, 0, 0, 0, 0, 0, 0, 0];

/// Nominal bitrate in kbps per frame type, for the types with a defined
/// rate. Used only for reporting.
pub fn nominal_bitrate_kbps(frame_type: usize) -> Option<u32> {
    match frame_type {
        0 => Some(5),  // 4.75 kbps
        1 => Some(6),  // 5.15 kbps
        2 => Some(6),  // 5.90 kbps
        3 => Some(7),  // 6.70 kbps
        4 => Some(8),  // 7.40 kbps
        5 => Some(8),  // 7.95 kbps
        6 => Some(10), // 10.2 kbps
        7 => Some(13), // 12.2 kbps
        _ => None,
    }
}

/// MR515 fixed-codebook gain correction factors, indexed by the 6-bit
/// joint gain quantizer index.
pub const GAIN_FAC_MR515: [i32; 64] = [
    28753, 2785, 6594, 7413, 10444, 1269, 4423, 1556,
    12820, 2498, 4833, 2498, 7864, 1884, 3153, 1802,
    20193, 3031, 5857, 4014, 8970, 1392, 4096, 655,
    13926, 3112, 4669, 2703, 6553, 901, 2662, 655,
    23511, 2457, 5079, 4096, 8560, 737, 4259, 2088,
    12288, 1474, 4628, 1433, 7004, 737, 2252, 1228,
    17326, 2334, 5816, 3686, 8601, 778, 3809, 614,
    9256, 1761, 3522, 1966, 5529, 737, 3194, 778,
];

/// MR515 quantization energies matching `GAIN_FAC_MR515`.
pub const QUA_ENER_MR515: [i32; 64] = [
    17333, -3431, 4235, 5276, 8325, -10422, 683, -8609,
    10148, -4398, 1472, -4398, 5802, -6907, -2327, -7303,
    14189, -2678, 3181, -180, 6972, -9599, 0, -16305,
    10884, -2444, 1165, -3697, 4180, -13468, -3833, -16305,
    15543, -4546, 1913, 0, 6556, -15255, 347, -5993,
    9771, -9090, 1086, -9341, 4772, -15255, -5321, -10714,
    12827, -5002, 3118, -938, 6598, -14774, -646, -16879,
    7251, -7508, -1343, -6529, 2668, -15255, -2212, -2454,
];

/// MR122 adaptive-codebook (pitch) gains, Q14, indexed by the 4-bit
/// pitch gain quantizer index.
pub const QUA_GAIN_PITCH_MR122: [i32; 16] = [
    0, 3277, 6556, 8192, 9830, 11469, 12288, 13107,
    13926, 14746, 15565, 16384, 17203, 18022, 18842, 19661,
];

/// MR122 fixed-codebook gains, indexed by the 5-bit code gain
/// quantizer index.
pub const QUA_GAIN_CODE_MR122: [i32; 32] = [
    159, 206, 268, 349, 419, 482, 554, 637,
    733, 842, 969, 1114, 1281, 1473, 1694, 1948,
    2241, 2577, 2963, 3408, 3919, 4507, 5183, 5960,
    6855, 7883, 9065, 10425, 12510, 16263, 21142, 27485,
];

/// Quantization energies matching `QUA_GAIN_CODE_MR122`, Q10 dB relative
/// to the codebook norm.
pub const QUA_ENER_CODE_MR122: [i32; 32] = [
    -22731, -20428, -18088, -15739, -14113, -12867, -11629, -10387,
    -9139, -7906, -6656, -5416, -4173, -2931, -1688, -445,
    801, 2044, 3285, 4530, 5772, 7016, 8259, 9501,
    10745, 11988, 13231, 14474, 16096, 18429, 20763, 23097,
];

/// Moving-average fixed-codebook gain predictor shared by all AMR modes.
///
/// Carries the last four quantization energies across subframes; the
/// prediction coefficients and mean-energy constant are the codec's own.
#[derive(Debug, Clone, Default)]
pub struct GainPredictor {
    prev_ener: [i32; 4],
}

impl GainPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicted fixed-codebook gain before correction.
    fn predicted(&self) -> i64 {
        (385963008i64
            + self.prev_ener[0] as i64 * 5571
            + self.prev_ener[1] as i64 * 4751
            + self.prev_ener[2] as i64 * 2785
            + self.prev_ener[3] as i64 * 1556)
            >> 15
    }

    fn shift_in(&mut self, qua_ener: i32) {
        self.prev_ener[3] = self.prev_ener[2];
        self.prev_ener[2] = self.prev_ener[1];
        self.prev_ener[1] = self.prev_ener[0];
        self.prev_ener[0] = qua_ener;
    }

    /// Gain estimate for one MR515 subframe from its 6-bit joint index.
    pub fn estimate_mr515(&mut self, index: u32) -> i32 {
        let index = (index & 0x3f) as usize;
        let gcode0 = self.predicted();
        let g_fac = GAIN_FAC_MR515[index] as i64;
        self.shift_in(QUA_ENER_MR515[index]);
        ((gcode0 * g_fac) >> 24) as i32
    }

    /// Gain estimates for an MR475 subframe pair from its 8-bit joint
    /// index. The pair shares one codebook row, so both subframes get the
    /// same correction factor while the predictor advances twice.
    pub fn estimate_mr475(&mut self, joint_index: u32) -> [i32; 2] {
        let row = (joint_index >> 2) & 0x3f;
        [self.estimate_mr515(row), self.estimate_mr515(row)]
    }

    /// Gain estimate for one MR122 subframe.
    ///
    /// `pulse_energy` is the reconstructed innovation energy of the ten
    /// codebook pulses (nominally 10, up to 20 when pulses collide) and
    /// `pitch_gain_index` applies pitch sharpening on top of the
    /// corrected prediction.
    pub fn estimate_mr122(
        &mut self,
        pitch_gain_index: u32,
        code_gain_index: u32,
        pulse_energy: i32,
    ) -> i32 {
        let code_gain_index = (code_gain_index & 0x1f) as usize;
        let gcode0 = self.predicted();
        let g_fac = QUA_GAIN_CODE_MR122[code_gain_index] as i64;
        self.shift_in(QUA_ENER_CODE_MR122[code_gain_index]);

        let base = (gcode0 * g_fac) >> 24;
        let scaled = base * pulse_energy.max(1) as i64 / 10;

        let gp = QUA_GAIN_PITCH_MR122[(pitch_gain_index & 0x0f) as usize] as i64;
        let sharpening = (scaled * ((gp * gp) >> 14)) >> 14;
        (scaled + sharpening) as i32
    }
}
