use std::error::Error;
use std::path::Path;
use std::{fmt, fs, io};

use geo::{Contains, MultiPolygon, Point};
use geojson::{FeatureCollection, GeoJson};

#[derive(Debug)]
pub enum GeoError {
    Io(io::Error),
    Parse(geojson::Error),
    MissingNameProperty(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(why) => write!(f, "could not read geodata: {}", why),
            Self::Parse(why) => write!(f, "could not parse geodata: {}", why),
            Self::MissingNameProperty(property) => {
                write!(f, "feature is missing the \"{}\" property", property)
            }
        }
    }
}

impl Error for GeoError {}

impl From<io::Error> for GeoError {
    fn from(why: io::Error) -> Self {
        Self::Io(why)
    }
}

impl From<geojson::Error> for GeoError {
    fn from(why: geojson::Error) -> Self {
        Self::Parse(why)
    }
}

struct Region {
    name: String,
    shape: MultiPolygon<f64>,
}

/// Point-in-polygon lookup over a GeoJSON FeatureCollection of named regions.
///
/// Each polygon or multi-polygon feature must carry its region name in the
/// property configured at load time. Features of other geometry kinds are
/// ignored.
pub struct RegionLocator {
    regions: Vec<Region>,
}

impl RegionLocator {
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        name_property: &str,
    ) -> Result<Self, GeoError> {
        let raw = fs::read_to_string(path)?;
        Self::from_geojson(&raw, name_property)
    }

    pub fn from_geojson(raw: &str, name_property: &str) -> Result<Self, GeoError> {
        let geojson: GeoJson = raw.parse()?;
        let collection = FeatureCollection::try_from(geojson)?;

        let mut regions = Vec::new();
        for feature in collection.features {
            let geometry = match feature.geometry {
                Some(geometry) => geometry,
                None => continue,
            };
            let name = feature
                .properties
                .as_ref()
                .and_then(|properties| properties.get(name_property))
                .and_then(|value| value.as_str())
                .ok_or_else(|| {
                    GeoError::MissingNameProperty(name_property.to_owned())
                })?
                .to_owned();

            let shape = match geo::Geometry::<f64>::try_from(geometry.value)? {
                geo::Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
                geo::Geometry::MultiPolygon(multi_polygon) => multi_polygon,
                _ => continue,
            };
            regions.push(Region { name, shape });
        }

        Ok(Self { regions })
    }

    /// Name of the first region containing the given coordinate, if any.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Option<&str> {
        let point = Point::new(longitude, latitude);
        self.regions
            .iter()
            .find(|region| region.shape.contains(&point))
            .map(|region| region.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
