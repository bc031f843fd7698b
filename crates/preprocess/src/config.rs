/// Every upload is scaled to this exact size before inference; detections are
/// reported in this coordinate space.
pub const INPUT_SIZE: (u32, u32) = (640, 640);
