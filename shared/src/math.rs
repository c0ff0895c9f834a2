use serde::{Deserialize, Serialize};
use troupe_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.w].iter().all(|c| c.is_finite())
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_finite(&self) -> bool {
        [self.r, self.g, self.b, self.a].iter().all(|c| c.is_finite())
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Placement handed to the registry when an actor is created
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

macro_rules! impl_float_struct_serde {
    ($ty:ident { $($field:ident),+ }) => {
        impl Serde for $ty {
            fn ser(&self, writer: &mut dyn BitWrite) {
                $( self.$field.ser(writer); )+
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                Ok(Self {
                    $( $field: f32::de(reader)?, )+
                })
            }
        }

        impl ConstBitLength for $ty {
            fn const_bit_length() -> u32 {
                let mut bits = 0;
                $( let _ = stringify!($field); bits += f32::const_bit_length(); )+
                bits
            }
        }
    };
}

impl_float_struct_serde!(Vec3 { x, y, z });
impl_float_struct_serde!(Quat { x, y, z, w });
impl_float_struct_serde!(Color { r, g, b, a });
