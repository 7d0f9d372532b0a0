//! Bedside calculators served under `/tools/{name}`.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalculatorError {
    #[error("unknown calculator `{0}`")]
    Unknown(String),
    #[error("missing input `{0}`")]
    Missing(&'static str),
    #[error("input `{field}` is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("input `{field}` must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("diastolic pressure must be below systolic pressure")]
    DiastolicAboveSystolic,
}

pub const CALCULATORS: &[&str] = &["bmi", "map", "qtc", "crcl", "cha2ds2-vasc"];

fn check(field: &'static str, value: f64, range: RangeInclusive<f64>) -> Result<f64, CalculatorError> {
    if value.is_finite() && range.contains(&value) {
        Ok(value)
    } else {
        Err(CalculatorError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bmi {
    pub value: f64,
    pub category: &'static str,
}

/// Body-mass index with its WHO category.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<Bmi, CalculatorError> {
    let weight = check("weight_kg", weight_kg, 1.0..=500.0)?;
    let height = check("height_cm", height_cm, 30.0..=280.0)? / 100.0;
    let value = round1(weight / (height * height));

    let category = match value {
        v if v < 18.5 => "Underweight",
        v if v < 25.0 => "Normal weight",
        v if v < 30.0 => "Overweight",
        v if v < 35.0 => "Obesity class I",
        v if v < 40.0 => "Obesity class II",
        _ => "Obesity class III",
    };

    Ok(Bmi { value, category })
}

/// Mean arterial pressure in mmHg.
pub fn mean_arterial_pressure(systolic: f64, diastolic: f64) -> Result<f64, CalculatorError> {
    let systolic = check("systolic", systolic, 40.0..=300.0)?;
    let diastolic = check("diastolic", diastolic, 10.0..=200.0)?;
    if diastolic >= systolic {
        return Err(CalculatorError::DiastolicAboveSystolic);
    }

    Ok(round1((systolic + 2.0 * diastolic) / 3.0))
}

/// Heart-rate corrected QT interval (Bazett), in milliseconds.
pub fn qtc_bazett(qt_ms: f64, heart_rate: f64) -> Result<f64, CalculatorError> {
    let qt = check("qt_ms", qt_ms, 100.0..=800.0)?;
    let rate = check("heart_rate", heart_rate, 20.0..=300.0)?;
    let rr_seconds = 60.0 / rate;

    Ok((qt / rr_seconds.sqrt()).round())
}

/// Creatinine clearance (Cockcroft-Gault) in mL/min, serum creatinine in mg/dL.
pub fn creatinine_clearance(
    age: f64,
    weight_kg: f64,
    serum_creatinine: f64,
    female: bool,
) -> Result<f64, CalculatorError> {
    let age = check("age", age, 18.0..=120.0)?;
    let weight = check("weight_kg", weight_kg, 1.0..=500.0)?;
    let creatinine = check("serum_creatinine", serum_creatinine, 0.1..=20.0)?;

    let clearance = (140.0 - age) * weight / (72.0 * creatinine);
    Ok(round1(if female { clearance * 0.85 } else { clearance }))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeRiskFactors {
    pub age: f64,
    pub female: bool,
    pub heart_failure: bool,
    pub hypertension: bool,
    pub diabetes: bool,
    pub stroke_or_tia: bool,
    pub vascular_disease: bool,
}

/// CHA₂DS₂-VASc stroke risk score, 0 to 9.
pub fn cha2ds2_vasc(factors: &StrokeRiskFactors) -> Result<u8, CalculatorError> {
    let age = check("age", factors.age, 0.0..=120.0)?;

    let age_points = if age >= 75.0 {
        2
    } else if age >= 65.0 {
        1
    } else {
        0
    };

    Ok(age_points
        + u8::from(factors.female)
        + u8::from(factors.heart_failure)
        + u8::from(factors.hypertension)
        + u8::from(factors.diabetes)
        + 2 * u8::from(factors.stroke_or_tia)
        + u8::from(factors.vascular_disease))
}

/// Named inputs as they arrive from a query string or the command line.
pub struct Inputs<'a>(&'a HashMap<String, String>);

impl<'a> Inputs<'a> {
    pub fn new(params: &'a HashMap<String, String>) -> Self {
        Self(params)
    }

    fn number(&self, field: &'static str) -> Result<f64, CalculatorError> {
        let raw = self.0.get(field).ok_or(CalculatorError::Missing(field))?;
        raw.trim().parse().map_err(|_| CalculatorError::NotANumber {
            field,
            value: raw.clone(),
        })
    }

    fn flag(&self, field: &str) -> bool {
        self.0
            .get(field)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

/// Run calculator `name` and describe its result as JSON.
pub fn run(name: &str, inputs: &Inputs) -> Result<Value, CalculatorError> {
    match name {
        "bmi" => {
            let result = bmi(inputs.number("weight_kg")?, inputs.number("height_cm")?)?;
            Ok(json!({ "calculator": name, "value": result.value, "unit": "kg/m²", "category": result.category }))
        }
        "map" => {
            let value = mean_arterial_pressure(inputs.number("systolic")?, inputs.number("diastolic")?)?;
            Ok(json!({ "calculator": name, "value": value, "unit": "mmHg" }))
        }
        "qtc" => {
            let value = qtc_bazett(inputs.number("qt_ms")?, inputs.number("heart_rate")?)?;
            Ok(json!({ "calculator": name, "value": value, "unit": "ms", "prolonged": value > 460.0 }))
        }
        "crcl" => {
            let value = creatinine_clearance(
                inputs.number("age")?,
                inputs.number("weight_kg")?,
                inputs.number("serum_creatinine")?,
                inputs.flag("female"),
            )?;
            Ok(json!({ "calculator": name, "value": value, "unit": "mL/min" }))
        }
        "cha2ds2-vasc" => {
            let score = cha2ds2_vasc(&StrokeRiskFactors {
                age: inputs.number("age")?,
                female: inputs.flag("female"),
                heart_failure: inputs.flag("heart_failure"),
                hypertension: inputs.flag("hypertension"),
                diabetes: inputs.flag("diabetes"),
                stroke_or_tia: inputs.flag("stroke_or_tia"),
                vascular_disease: inputs.flag("vascular_disease"),
            })?;
            Ok(json!({ "calculator": name, "value": score, "unit": "points" }))
        }
        other => Err(CalculatorError::Unknown(other.to_owned())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bmi_categories() {
        assert_eq!(bmi(70.0, 175.0).unwrap(), Bmi { value: 22.9, category: "Normal weight" });
        assert_eq!(bmi(50.0, 175.0).unwrap().category, "Underweight");
        assert_eq!(bmi(130.0, 170.0).unwrap().category, "Obesity class III");
        assert!(matches!(bmi(70.0, 0.0), Err(CalculatorError::OutOfRange { field: "height_cm", .. })));
        assert!(bmi(f64::NAN, 170.0).is_err());
    }

    #[test]
    fn map_and_qtc() {
        assert_eq!(mean_arterial_pressure(120.0, 80.0).unwrap(), 93.3);
        assert_eq!(mean_arterial_pressure(80.0, 120.0), Err(CalculatorError::DiastolicAboveSystolic));

        // At 60 bpm the RR interval is one second and QTc equals QT.
        assert_eq!(qtc_bazett(400.0, 60.0).unwrap(), 400.0);
        assert_eq!(qtc_bazett(400.0, 100.0).unwrap(), 516.0);
    }

    #[test]
    fn cockcroft_gault() {
        assert_eq!(creatinine_clearance(60.0, 72.0, 1.0, false).unwrap(), 80.0);
        assert_eq!(creatinine_clearance(60.0, 72.0, 1.0, true).unwrap(), 68.0);
        assert!(creatinine_clearance(10.0, 72.0, 1.0, false).is_err());
    }

    #[test]
    fn stroke_risk() {
        assert_eq!(cha2ds2_vasc(&StrokeRiskFactors { age: 50.0, ..Default::default() }).unwrap(), 0);

        let everything = StrokeRiskFactors {
            age: 80.0,
            female: true,
            heart_failure: true,
            hypertension: true,
            diabetes: true,
            stroke_or_tia: true,
            vascular_disease: true,
        };
        assert_eq!(cha2ds2_vasc(&everything).unwrap(), 9);
        assert_eq!(
            cha2ds2_vasc(&StrokeRiskFactors { age: 70.0, hypertension: true, ..Default::default() }).unwrap(),
            2
        );
    }

    #[test]
    fn runs_by_name() {
        let params: HashMap<String, String> = [("weight_kg", "70"), ("height_cm", "175")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        let result = run("bmi", &Inputs::new(&params)).unwrap();
        assert_eq!(result["value"], 22.9);
        assert_eq!(result["category"], "Normal weight");

        assert_eq!(run("map", &Inputs::new(&params)), Err(CalculatorError::Missing("systolic")));
        assert_eq!(run("nope", &Inputs::new(&params)), Err(CalculatorError::Unknown("nope".into())));
    }
}
