//! Fixed crop geometry for each game surface, in native-frame coordinates.

use crate::imageutil::Rect;
use crate::model::SurfaceType;

/// Where a surface's primary text block lives.
#[derive(Clone, Copy, Debug)]
pub enum BodyRegion {
    /// A window of the given size centered in the frame.
    Centered { width: u32, height: u32 },
    Fixed(Rect),
}

/// Crop table for one surface type.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceLayout {
    pub surface: SurfaceType,
    pub body: BodyRegion,
    /// Light-on-dark surfaces are inverted before OCR.
    pub invert: bool,
    /// Rect carrying the mailer's message number.
    pub index: Option<Rect>,
    /// Rect carrying the mailer's subject line.
    pub subject: Option<Rect>,
}

pub const LAYOUTS: [SurfaceLayout; 3] = [
    SurfaceLayout {
        surface: SurfaceType::Tent,
        body: BodyRegion::Fixed(Rect::from_corners(105, 125, 535, 310)),
        invert: true,
        index: None,
        subject: None,
    },
    SurfaceLayout {
        surface: SurfaceType::Mailer,
        body: BodyRegion::Fixed(Rect::from_corners(18, 178, 622, 446)),
        invert: false,
        index: Some(Rect::from_corners(47, 74, 73, 91)),
        subject: Some(Rect::from_corners(77, 74, 523, 92)),
    },
    SurfaceLayout {
        surface: SurfaceType::Scanner,
        body: BodyRegion::Centered { width: 604, height: 412 },
        invert: true,
        index: None,
        subject: None,
    },
];

pub fn layout(surface: SurfaceType) -> &'static SurfaceLayout {
    match surface {
        SurfaceType::Tent => &LAYOUTS[0],
        SurfaceType::Mailer => &LAYOUTS[1],
        SurfaceType::Scanner => &LAYOUTS[2],
    }
}
