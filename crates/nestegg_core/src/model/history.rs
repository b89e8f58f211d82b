//! Bundled annual rate history
//!
//! Four series sharing one calendar, 1928 through 2022, expressed as
//! decimal annual rates. Values follow the NYU Stern (Damodaran) annual
//! returns table. The data is immutable and shared freely across threads.

use serde::{Deserialize, Serialize};

use super::market::RateSet;
use crate::error::RateDataRangeError;

/// First calendar year covered by the bundled series
pub const FIRST_YEAR: i16 = 1928;
/// Last calendar year covered by the bundled series
pub const LAST_YEAR: i16 = 2022;

/// Reject windows that are empty or fall outside the bundled years.
pub fn check_window(from: i16, to: i16) -> Result<(), RateDataRangeError> {
    if from < FIRST_YEAR || to > LAST_YEAR || from > to {
        return Err(RateDataRangeError {
            from,
            to,
            available_from: FIRST_YEAR,
            available_to: LAST_YEAR,
        });
    }
    Ok(())
}

/// Rates realized in one calendar year, if covered.
#[must_use]
pub fn rate_set(year: i16) -> Option<RateSet> {
    if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
        return None;
    }
    let i = (year - FIRST_YEAR) as usize;
    Some(RateSet::new(
        series::EQUITY[i],
        series::CORPORATE_BONDS[i],
        series::TREASURY_NOTES[i],
        series::INFLATION[i],
    ))
}

/// All rate sets of the inclusive window [from, to], in calendar order.
pub fn window(from: i16, to: i16) -> Result<Vec<RateSet>, RateDataRangeError> {
    check_window(from, to)?;
    Ok((from..=to).filter_map(rate_set).collect())
}

/// Sample moments of a historical window, per asset class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub from: i16,
    pub to: i16,
    pub mean: [f64; 4],
    /// Sample covariance (n - 1 denominator)
    pub covariance: [[f64; 4]; 4],
}

impl WindowStatistics {
    /// Fit mean vector and covariance matrix to [from, to].
    pub fn fit(from: i16, to: i16) -> Result<Self, RateDataRangeError> {
        let sets = window(from, to)?;
        Ok(Self::from_samples(from, to, &sets))
    }

    #[must_use]
    pub fn from_samples(from: i16, to: i16, samples: &[RateSet]) -> Self {
        let n = samples.len().max(1) as f64;
        let mut mean = [0.0; 4];
        for s in samples {
            for (m, v) in mean.iter_mut().zip(s.values()) {
                *m += v / n;
            }
        }

        let denom = (samples.len().saturating_sub(1)).max(1) as f64;
        let mut covariance = [[0.0; 4]; 4];
        for s in samples {
            let v = s.values();
            for j in 0..4 {
                for k in 0..4 {
                    covariance[j][k] += (v[j] - mean[j]) * (v[k] - mean[k]) / denom;
                }
            }
        }

        Self {
            from,
            to,
            mean,
            covariance,
        }
    }
}

pub mod series {
    /// S&P 500 total return including dividends.
    pub const EQUITY: &[f64] = &[
        0.4381, -0.0830, -0.2512, -0.4384, -0.0864, 0.4998, -0.0119, 0.4674, 0.3194, -0.3534,
        0.2928, -0.0110, -0.1067, -0.1277, 0.1917, 0.2506, 0.1903, 0.3582, -0.0843, 0.0520, 0.0570,
        0.1830, 0.3081, 0.2368, 0.1815, -0.0121, 0.5256, 0.3260, 0.0744, -0.1046, 0.4372, 0.1206,
        0.0034, 0.2664, -0.0881, 0.2261, 0.1642, 0.1240, -0.0997, 0.2380, 0.1081, -0.0824, 0.0356,
        0.1422, 0.1876, -0.1431, -0.2590, 0.3700, 0.2383, -0.0698, 0.0651, 0.1852, 0.3174, -0.0470,
        0.2042, 0.2234, 0.0615, 0.3124, 0.1849, 0.0581, 0.1654, 0.3148, -0.0306, 0.3023, 0.0749,
        0.0997, 0.0133, 0.3720, 0.2268, 0.3310, 0.2834, 0.2089, -0.0903, -0.1185, -0.2197, 0.2836,
        0.1074, 0.0483, 0.1561, 0.0548, -0.3655, 0.2594, 0.1482, 0.0210, 0.1589, 0.3215, 0.1352,
        0.0138, 0.1177, 0.2161, -0.0423, 0.3121, 0.1802, 0.2847, -0.1801,
    ];

    /// AA-rated corporate bond total return.
    pub const CORPORATE_BONDS: &[f64] = &[
        0.0322, 0.0302, 0.0054, -0.1568, 0.2359, 0.1297, 0.1882, 0.1331, 0.1138, -0.0442, 0.0924,
        0.0798, 0.0865, 0.0501, 0.0518, 0.0804, 0.0657, 0.0680, 0.0251, 0.0026, 0.0344, 0.0538,
        0.0424, -0.0019, 0.0444, 0.0162, 0.0616, 0.0204, -0.0235, -0.0072, 0.0643, 0.0157, 0.0666,
        0.0510, 0.0650, 0.0546, 0.0516, 0.0319, -0.0345, 0.0090, 0.0485, -0.0203, 0.0565, 0.1400,
        0.1141, 0.0432, -0.0438, 0.1105, 0.1975, 0.0995, 0.0314, -0.0201, -0.0332, 0.0846, 0.2905,
        0.1619, 0.1562, 0.2386, 0.2149, 0.0229, 0.1512, 0.1579, 0.0614, 0.1785, 0.1217, 0.1643,
        -0.0132, 0.2016, 0.0479, 0.1183, 0.0795, 0.0084, 0.0933, 0.0782, 0.1218, 0.1353, 0.0989,
        0.0492, 0.0705, 0.0315, -0.0507, 0.2333, 0.0835, 0.1258, 0.1012, -0.0106, 0.1038, -0.0070,
        0.1037, 0.0972, -0.0276, 0.1533, 0.1041, 0.0093, -0.1449,
    ];

    /// 10-year US Treasury note total return.
    pub const TREASURY_NOTES: &[f64] = &[
        0.0084, 0.0420, 0.0454, -0.0256, 0.0879, 0.0186, 0.0796, 0.0447, 0.0502, 0.0138, 0.0421,
        0.0441, 0.0540, -0.0202, 0.0229, 0.0249, 0.0258, 0.0380, 0.0313, 0.0092, 0.0195, 0.0466,
        0.0043, -0.0030, 0.0227, 0.0414, 0.0329, -0.0134, -0.0226, 0.0680, -0.0210, -0.0265, 0.1164,
        0.0206, 0.0569, 0.0168, 0.0373, 0.0072, 0.0291, -0.0158, 0.0327, -0.0501, 0.1675, 0.0979,
        0.0282, 0.0366, 0.0199, 0.0361, 0.1598, 0.0129, -0.0078, 0.0067, -0.0299, 0.0820, 0.3281,
        0.0320, 0.1373, 0.2571, 0.2428, -0.0496, 0.0822, 0.1769, 0.0624, 0.1500, 0.0936, 0.1421,
        -0.0804, 0.2348, 0.0143, 0.0994, 0.1492, -0.0825, 0.1666, 0.0557, 0.1512, 0.0038, 0.0449,
        0.0287, 0.0196, 0.1021, 0.2010, -0.1112, 0.0846, 0.1604, 0.0297, -0.0910, 0.1075, 0.0128,
        0.0069, 0.0280, -0.0002, 0.0964, 0.1133, -0.0442, -0.1783,
    ];

    /// US CPI inflation.
    pub const INFLATION: &[f64] = &[
        -0.0116, 0.0058, -0.0640, -0.0932, -0.1027, 0.0076, 0.0152, 0.0299, 0.0145, 0.0286, -0.0278,
        0.0000, 0.0071, 0.0993, 0.0903, 0.0296, 0.0230, 0.0225, 0.1813, 0.0884, 0.0299, -0.0207,
        0.0593, 0.0600, 0.0075, 0.0075, -0.0074, 0.0037, 0.0299, 0.0290, 0.0176, 0.0173, 0.0136,
        0.0067, 0.0133, 0.0164, 0.0097, 0.0192, 0.0346, 0.0304, 0.0472, 0.0620, 0.0557, 0.0327,
        0.0341, 0.0871, 0.1234, 0.0694, 0.0486, 0.0670, 0.0902, 0.1329, 0.1252, 0.0892, 0.0383,
        0.0379, 0.0395, 0.0380, 0.0110, 0.0443, 0.0442, 0.0465, 0.0611, 0.0306, 0.0290, 0.0275,
        0.0267, 0.0254, 0.0332, 0.0170, 0.0161, 0.0268, 0.0339, 0.0155, 0.0238, 0.0188, 0.0326,
        0.0342, 0.0254, 0.0408, 0.0009, 0.0272, 0.0150, 0.0296, 0.0174, 0.0150, 0.0076, 0.0073,
        0.0207, 0.0211, 0.0191, 0.0229, 0.0136, 0.0710, 0.0642,
    ];
}
