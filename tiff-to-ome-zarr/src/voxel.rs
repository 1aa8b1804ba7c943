//! Element types a stack may carry.

use zarrs::array::{data_type, DataType, Element};

/// A numeric element type that can be stored in a pyramid level.
///
/// Values widen losslessly (up to 53 bits) into `f64` for filtering and are
/// cast back with [`Voxel::from_f64`].
pub trait Voxel: Element + Copy + Default + Send + Sync + 'static {
    /// numpy-style name used in summaries.
    const NAME: &'static str;

    fn data_type() -> DataType;

    fn to_f64(self) -> f64;

    /// Integers truncate toward zero and saturate at the type bounds, NaN maps
    /// to zero. Floats cast directly.
    fn from_f64(value: f64) -> Self;

    /// Display window `(min, max)` recorded in channel metadata.
    fn window() -> (f64, f64);
}

macro_rules! impl_voxel_int {
    ($($ty:ty => $name:literal, $dt:ident;)*) => {
        $(
            impl Voxel for $ty {
                const NAME: &'static str = $name;

                fn data_type() -> DataType {
                    data_type::$dt()
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                fn window() -> (f64, f64) {
                    (<$ty>::MIN as f64, <$ty>::MAX as f64)
                }
            }
        )*
    };
}

macro_rules! impl_voxel_float {
    ($($ty:ty => $name:literal, $dt:ident;)*) => {
        $(
            impl Voxel for $ty {
                const NAME: &'static str = $name;

                fn data_type() -> DataType {
                    data_type::$dt()
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                fn window() -> (f64, f64) {
                    (0.0, 1.0)
                }
            }
        )*
    };
}

impl_voxel_int! {
    u8 => "uint8", uint8;
    u16 => "uint16", uint16;
    u32 => "uint32", uint32;
    u64 => "uint64", uint64;
    i8 => "int8", int8;
    i16 => "int16", int16;
    i32 => "int32", int32;
    i64 => "int64", int64;
}

impl_voxel_float! {
    f32 => "float32", float32;
    f64 => "float64", float64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_cast_truncates_and_saturates() {
        assert_eq!(u16::from_f64(65534.9999999), 65534);
        assert_eq!(u8::from_f64(2.5), 2);
        assert_eq!(u16::from_f64(70000.0), u16::MAX);
        assert_eq!(u8::from_f64(-3.0), 0);
        assert_eq!(i16::from_f64(-2.6), -2);
        assert_eq!(i8::from_f64(-200.0), i8::MIN);
        assert_eq!(u8::from_f64(f64::NAN), 0);
    }

    #[test]
    fn float_cast_is_plain() {
        assert_eq!(f32::from_f64(0.25), 0.25f32);
        assert!(f64::from_f64(f64::NAN).is_nan());
    }

    #[test]
    fn windows_follow_type_range() {
        assert_eq!(u8::window(), (0.0, 255.0));
        assert_eq!(i16::window(), (-32768.0, 32767.0));
        assert_eq!(f32::window(), (0.0, 1.0));
    }
}
