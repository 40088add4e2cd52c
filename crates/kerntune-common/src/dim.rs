use serde::{Deserialize, Serialize};

/// One of the three launch dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierDimension {
    /// The first dimension.
    X,
    /// The second dimension.
    Y,
    /// The third dimension.
    Z,
}

impl ModifierDimension {
    /// All dimensions, in order.
    pub const ALL: [ModifierDimension; 3] =
        [ModifierDimension::X, ModifierDimension::Y, ModifierDimension::Z];
}

/// An extent of up to three dimensions, used for global and local launch sizes.
///
/// Unused dimensions are set to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionVector {
    /// The extent in the x axis.
    pub x: usize,
    /// The extent in the y axis.
    pub y: usize,
    /// The extent in the z axis.
    pub z: usize,
}

impl Default for DimensionVector {
    fn default() -> Self {
        Self::new_single()
    }
}

impl DimensionVector {
    /// Create a new three dimensional extent.
    pub const fn new_3d(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Create a new two dimensional extent.
    pub const fn new_2d(x: usize, y: usize) -> Self {
        Self { x, y, z: 1 }
    }

    /// Create a new one dimensional extent.
    pub const fn new_1d(x: usize) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// An extent of a single unit.
    pub const fn new_single() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// The total number of units covered by the extent.
    pub fn total_size(&self) -> usize {
        self.x * self.y * self.z
    }

    /// The extent along the given dimension.
    pub fn get(&self, dimension: ModifierDimension) -> usize {
        match dimension {
            ModifierDimension::X => self.x,
            ModifierDimension::Y => self.y,
            ModifierDimension::Z => self.z,
        }
    }

    /// Set the extent along the given dimension.
    pub fn set(&mut self, dimension: ModifierDimension, value: usize) {
        match dimension {
            ModifierDimension::X => self.x = value,
            ModifierDimension::Y => self.y = value,
            ModifierDimension::Z => self.z = value,
        }
    }

    /// The extent as an array `[x, y, z]`.
    pub fn as_array(&self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }

    /// Whether every dimension of `self` is a multiple of the same dimension of `divisor`.
    ///
    /// A zero divisor never divides.
    pub fn is_divisible_by(&self, divisor: &DimensionVector) -> bool {
        ModifierDimension::ALL.iter().all(|dim| {
            let divisor = divisor.get(*dim);
            divisor != 0 && self.get(*dim) % divisor == 0
        })
    }

    /// Round every dimension up to the nearest multiple of the same dimension of `multiple`.
    ///
    /// Dimensions of `multiple` equal to zero leave the corresponding dimension untouched.
    pub fn round_up_to_multiple_of(&self, multiple: &DimensionVector) -> Self {
        let mut result = *self;

        for dim in ModifierDimension::ALL {
            let step = multiple.get(dim);
            if step == 0 {
                continue;
            }
            let value = self.get(dim);
            result.set(dim, value.div_ceil(step) * step);
        }

        result
    }
}

impl From<[usize; 3]> for DimensionVector {
    fn from(value: [usize; 3]) -> Self {
        Self::new_3d(value[0], value[1], value[2])
    }
}

impl From<(usize, usize, usize)> for DimensionVector {
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Self::new_3d(x, y, z)
    }
}

impl core::fmt::Display for DimensionVector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
