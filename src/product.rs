use strum::IntoStaticStr;

use crate::{error::ArchError, sector::Sector};

/// Processing level of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum ProductLevel {
    #[strum(serialize = "L1b")]
    L1b,
    #[strum(serialize = "L2")]
    L2,
}

const LEVEL_KEYS: [&str; 2] = ["L1b", "L2"];

impl ProductLevel {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_uppercase().as_str() {
            "L1B" => Ok(ProductLevel::L1b),
            "L2" => Ok(ProductLevel::L2),
            _ => Err(ArchError::invalid(name, "product_level", &LEVEL_KEYS)),
        }
    }

    /// Filename glob appended to each time-bucket directory.
    pub fn fname_glob(self) -> &'static str {
        match self {
            ProductLevel::L1b => "*.DAT*",
            ProductLevel::L2 => "*.nc",
        }
    }

    pub fn available() -> &'static [&'static str] {
        &LEVEL_KEYS
    }
}

/// Canonical product acronyms.
///
/// Several raw on-disk spellings normalize to one key; see
/// [`Product::from_raw_token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Product {
    /// L1b per-band radiances (segmented HSD files).
    Rad,
    /// L2 cloud mask.
    CMSK,
    /// L2 cloud top height.
    CHGT,
    /// L2 cloud top phase.
    CPHS,
    /// L2 rainfall rate (quantitative precipitation estimate).
    RRQPE,
}

const PRODUCT_KEYS: [&str; 5] = ["Rad", "CMSK", "CHGT", "CPHS", "RRQPE"];

impl Product {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_uppercase().as_str() {
            "RAD" | "RADIANCES" => Ok(Product::Rad),
            "CMSK" | "CLOUD_MASK" => Ok(Product::CMSK),
            "CHGT" | "CLOUD_HEIGHT" => Ok(Product::CHGT),
            "CPHS" | "CLOUD_PHASE" => Ok(Product::CPHS),
            "RRQPE" | "HYDRO_RAIN_RATE" => Ok(Product::RRQPE),
            _ => Err(ArchError::invalid(name, "product", &PRODUCT_KEYS)),
        }
    }

    /// Normalize a raw filename token (canonical or legacy spelling) to
    /// the canonical key. Unlike [`Product::from_alias`] this is exact
    /// case-sensitive matching against the spellings observed on disk.
    pub fn from_raw_token(token: &str) -> Option<Self> {
        match token {
            "Rad" => Some(Product::Rad),
            "CMSK" | "CLOUD_MASK" => Some(Product::CMSK),
            "CHGT" | "CLOUD_HEIGHT" => Some(Product::CHGT),
            "CPHS" | "CLOUD_PHASE" => Some(Product::CPHS),
            "RRQPE" | "HYDRO_RAIN_RATE" => Some(Product::RRQPE),
            _ => None,
        }
    }

    /// All spellings of this product that can appear inside a filename.
    pub fn raw_spellings(self) -> &'static [&'static str] {
        match self {
            Product::Rad => &["HS_"],
            Product::CMSK => &["CMSK", "CLOUD_MASK"],
            Product::CHGT => &["CHGT", "CLOUD_HEIGHT"],
            Product::CPHS => &["CPHS", "CLOUD_PHASE"],
            Product::RRQPE => &["RRQPE", "HYDRO_RAIN_RATE"],
        }
    }

    pub fn product_level(self) -> ProductLevel {
        match self {
            Product::Rad => ProductLevel::L1b,
            _ => ProductLevel::L2,
        }
    }

    /// Sectors for which this product is published. The L2 products are
    /// full-disk only.
    pub fn available_sectors(self) -> &'static [Sector] {
        match self {
            Product::Rad => &[
                Sector::FullDisk,
                Sector::Japan,
                Sector::Target,
                Sector::Landmark,
            ],
            _ => &[Sector::FullDisk],
        }
    }

    /// Whether this product exposes per-band channels.
    pub fn has_channels(self) -> bool {
        matches!(self, Product::Rad)
    }

    pub fn available() -> &'static [&'static str] {
        &PRODUCT_KEYS
    }

    pub fn available_for(level: ProductLevel) -> &'static [&'static str] {
        match level {
            ProductLevel::L1b => &["Rad"],
            ProductLevel::L2 => &["CMSK", "CHGT", "CPHS", "RRQPE"],
        }
    }
}

/// Fully validated (satellite-independent) product coordinates.
///
/// Construction enforces the cross-field constraints: the product must
/// belong to the level, and the sector must be one the product is
/// published for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductKey {
    pub product_level: ProductLevel,
    pub product: Product,
    pub sector: Sector,
}

impl ProductKey {
    pub fn new(
        product_level: ProductLevel,
        product: Product,
        sector: Sector,
    ) -> Result<Self, ArchError> {
        if product.product_level() != product_level {
            let level: &'static str = product_level.into();
            return Err(ArchError::InvalidArgument(format!(
                "product_level '{}' does not include product '{:?}'. Available {} products: {:?}",
                level,
                product,
                level,
                Product::available_for(product_level),
            )));
        }
        if !product.available_sectors().contains(&sector) {
            return Err(ArchError::InvalidArgument(format!(
                "sector '{:?}' is not available for product '{:?}'. Valid sectors: {:?}",
                sector,
                product,
                product.available_sectors(),
            )));
        }
        Ok(ProductKey {
            product_level,
            product,
            sector,
        })
    }
}
