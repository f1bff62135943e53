//! Static location catalog
//!
//! Maps well-known city names to coordinates. The reanalysis tier only
//! accepts coordinates, so named requests are resolved here first.

use haversine::{distance, Location as HaversineLocation, Units};
use skyloom_core::{Coordinates, LocationData};

/// Number of leading entries shown on the dashboard
const FEATURED_COUNT: usize = 5;

/// (name, latitude, longitude); the first `FEATURED_COUNT` are featured
const CITIES: &[(&str, f64, f64)] = &[
    ("New York, USA", 40.7128, -74.0060),
    ("London, UK", 51.5074, -0.1278),
    ("Tokyo, Japan", 35.6762, 139.6503),
    ("Sydney, Australia", -33.8688, 151.2093),
    ("Mumbai, India", 19.0760, 72.8777),
    ("Los Angeles, USA", 34.0522, -118.2437),
    ("Chicago, USA", 41.8781, -87.6298),
    ("Houston, USA", 29.7604, -95.3698),
    ("Phoenix, USA", 33.4484, -112.0740),
    ("Philadelphia, USA", 39.9526, -75.1652),
    ("San Francisco, USA", 37.7749, -122.4194),
    ("Seattle, USA", 47.6062, -122.3321),
    ("Miami, USA", 25.7617, -80.1918),
    ("Boston, USA", 42.3601, -71.0589),
    ("Denver, USA", 39.7392, -104.9903),
    ("Atlanta, USA", 33.7490, -84.3880),
    ("Washington, USA", 38.9072, -77.0369),
    ("Las Vegas, USA", 36.1699, -115.1398),
    ("Anchorage, USA", 61.2181, -149.9003),
    ("Honolulu, USA", 21.3069, -157.8583),
    ("Toronto, Canada", 43.6532, -79.3832),
    ("Montreal, Canada", 45.5017, -73.5673),
    ("Vancouver, Canada", 49.2827, -123.1207),
    ("Calgary, Canada", 51.0447, -114.0719),
    ("Mexico City, Mexico", 19.4326, -99.1332),
    ("Guadalajara, Mexico", 20.6597, -103.3496),
    ("Havana, Cuba", 23.1136, -82.3666),
    ("Panama City, Panama", 8.9824, -79.5199),
    ("Bogota, Colombia", 4.7110, -74.0721),
    ("Lima, Peru", -12.0464, -77.0428),
    ("Quito, Ecuador", -0.1807, -78.4678),
    ("Caracas, Venezuela", 10.4806, -66.9036),
    ("Santiago, Chile", -33.4489, -70.6693),
    ("Buenos Aires, Argentina", -34.6037, -58.3816),
    ("Montevideo, Uruguay", -34.9011, -56.1645),
    ("Sao Paulo, Brazil", -23.5505, -46.6333),
    ("Rio de Janeiro, Brazil", -22.9068, -43.1729),
    ("Brasilia, Brazil", -15.8267, -47.9218),
    ("Reykjavik, Iceland", 64.1466, -21.9426),
    ("Dublin, Ireland", 53.3498, -6.2603),
    ("Edinburgh, UK", 55.9533, -3.1883),
    ("Manchester, UK", 53.4808, -2.2426),
    ("Paris, France", 48.8566, 2.3522),
    ("Marseille, France", 43.2965, 5.3698),
    ("Lyon, France", 45.7640, 4.8357),
    ("Brussels, Belgium", 50.8503, 4.3517),
    ("Amsterdam, Netherlands", 52.3676, 4.9041),
    ("Rotterdam, Netherlands", 51.9244, 4.4777),
    ("Berlin, Germany", 52.5200, 13.4050),
    ("Hamburg, Germany", 53.5511, 9.9937),
    ("Munich, Germany", 48.1351, 11.5820),
    ("Frankfurt, Germany", 50.1109, 8.6821),
    ("Zurich, Switzerland", 47.3769, 8.5417),
    ("Geneva, Switzerland", 46.2044, 6.1432),
    ("Vienna, Austria", 48.2082, 16.3738),
    ("Prague, Czech Republic", 50.0755, 14.4378),
    ("Warsaw, Poland", 52.2297, 21.0122),
    ("Budapest, Hungary", 47.4979, 19.0402),
    ("Copenhagen, Denmark", 55.6761, 12.5683),
    ("Oslo, Norway", 59.9139, 10.7522),
    ("Stockholm, Sweden", 59.3293, 18.0686),
    ("Helsinki, Finland", 60.1699, 24.9384),
    ("Madrid, Spain", 40.4168, -3.7038),
    ("Barcelona, Spain", 41.3851, 2.1734),
    ("Lisbon, Portugal", 38.7223, -9.1393),
    ("Rome, Italy", 41.9028, 12.4964),
    ("Milan, Italy", 45.4642, 9.1900),
    ("Athens, Greece", 37.9838, 23.7275),
    ("Istanbul, Turkey", 41.0082, 28.9784),
    ("Ankara, Turkey", 39.9334, 32.8597),
    ("Bucharest, Romania", 44.4268, 26.1025),
    ("Kyiv, Ukraine", 50.4501, 30.5234),
    ("Moscow, Russia", 55.7558, 37.6173),
    ("Saint Petersburg, Russia", 59.9311, 30.3609),
    ("Cairo, Egypt", 30.0444, 31.2357),
    ("Casablanca, Morocco", 33.5731, -7.5898),
    ("Lagos, Nigeria", 6.5244, 3.3792),
    ("Accra, Ghana", 5.6037, -0.1870),
    ("Nairobi, Kenya", -1.2921, 36.8219),
    ("Addis Ababa, Ethiopia", 9.0054, 38.7636),
    ("Kinshasa, DR Congo", -4.4419, 15.2663),
    ("Johannesburg, South Africa", -26.2041, 28.0473),
    ("Cape Town, South Africa", -33.9249, 18.4241),
    ("Dubai, UAE", 25.2048, 55.2708),
    ("Riyadh, Saudi Arabia", 24.7136, 46.6753),
    ("Tehran, Iran", 35.6892, 51.3890),
    ("Karachi, Pakistan", 24.8607, 67.0011),
    ("Delhi, India", 28.7041, 77.1025),
    ("Bangalore, India", 12.9716, 77.5946),
    ("Kolkata, India", 22.5726, 88.3639),
    ("Chennai, India", 13.0827, 80.2707),
    ("Dhaka, Bangladesh", 23.8103, 90.4125),
    ("Kathmandu, Nepal", 27.7172, 85.3240),
    ("Bangkok, Thailand", 13.7563, 100.5018),
    ("Hanoi, Vietnam", 21.0278, 105.8342),
    ("Singapore, Singapore", 1.3521, 103.8198),
    ("Kuala Lumpur, Malaysia", 3.1390, 101.6869),
    ("Jakarta, Indonesia", -6.2088, 106.8456),
    ("Manila, Philippines", 14.5995, 120.9842),
    ("Hong Kong, China", 22.3193, 114.1694),
    ("Shanghai, China", 31.2304, 121.4737),
    ("Beijing, China", 39.9042, 116.4074),
    ("Seoul, South Korea", 37.5665, 126.9780),
    ("Osaka, Japan", 34.6937, 135.5023),
    ("Melbourne, Australia", -37.8136, 144.9631),
    ("Perth, Australia", -31.9505, 115.8605),
    ("Auckland, New Zealand", -36.8485, 174.7633),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub coordinates: Coordinates,
}

impl CatalogEntry {
    /// City part of the name, before the first comma
    fn city(&self) -> &str {
        self.name.split(',').next().unwrap_or(&self.name).trim()
    }

    pub fn to_location(&self) -> LocationData {
        LocationData {
            name: self.name.clone(),
            coordinates: self.coordinates,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationCatalog {
    entries: Vec<CatalogEntry>,
}

impl LocationCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Built-in table of major cities
    pub fn builtin() -> Self {
        Self::new(
            CITIES
                .iter()
                .map(|&(name, latitude, longitude)| CatalogEntry {
                    name: name.to_string(),
                    coordinates: Coordinates::new(latitude, longitude),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive match on the full name or on the city alone,
    /// so "london", "London, UK" and "London, United Kingdom" all resolve
    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let wanted_city = wanted.split(',').next().unwrap_or(&wanted).trim();

        self.entries
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.city().to_lowercase() == wanted_city)
            })
    }

    /// Entries whose name contains `query`, case-insensitively
    pub fn search(&self, query: &str, limit: usize) -> Vec<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    /// Entries within `radius_m` metres of `at`, nearest first
    pub fn nearby(&self, at: Coordinates, radius_m: f64) -> Vec<(&CatalogEntry, f64)> {
        let origin = HaversineLocation {
            latitude: at.latitude,
            longitude: at.longitude,
        };
        let mut hits: Vec<(&CatalogEntry, f64)> = self
            .entries
            .iter()
            .map(|e| {
                let km = distance(
                    HaversineLocation {
                        latitude: e.coordinates.latitude,
                        longitude: e.coordinates.longitude,
                    },
                    HaversineLocation { ..origin },
                    Units::Kilometers,
                );
                (e, km * 1000.0)
            })
            .filter(|(_, metres)| *metres <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    pub fn featured(&self) -> &[CatalogEntry] {
        &self.entries[..FEATURED_COUNT.min(self.entries.len())]
    }
}

impl Default for LocationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
