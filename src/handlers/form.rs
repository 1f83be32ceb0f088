use crate::error::ValidationError;
use crate::models::{DietaryGoal, Gender, GoalDirection, ImagePayload};

/// A file field exactly as the browser sent it.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Untyped form fields, before any checks.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub prompt: Option<String>,
    pub image: Option<UploadedFile>,
    pub goal: Option<String>,
    pub weight: Option<String>,
    pub target_weight: Option<String>,
    pub gender: Option<String>,
}

/// What the user filled in. Prompt and image may still be missing; the
/// submission handler decides whether that is acceptable.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub prompt: String,
    pub image: Option<ImagePayload>,
    pub goal: Option<DietaryGoal>,
}

pub fn collect(raw: RawForm) -> Result<SubmissionForm, ValidationError> {
    let prompt = raw.prompt.unwrap_or_default();

    let image = match raw.image {
        Some(file) if !file.bytes.is_empty() => Some(image_payload(file)?),
        _ => None,
    };

    let goal_value = raw.goal.unwrap_or_default();
    let direction = GoalDirection::from_selection(&goal_value)
        .ok_or_else(|| ValidationError::UnknownGoal(goal_value.clone()))?;

    // Weight and gender only exist once a goal is chosen.
    let goal = match direction {
        None => None,
        Some(direction) => {
            let gender = match raw.gender.as_deref().map(str::trim) {
                None | Some("") => Gender::Male,
                Some(value) => Gender::from_string(value)
                    .ok_or_else(|| ValidationError::UnknownGender(value.to_string()))?,
            };

            Some(DietaryGoal {
                direction,
                current_weight_kg: parse_weight("weight", raw.weight.as_deref())?,
                target_weight_kg: parse_weight("target weight", raw.target_weight.as_deref())?,
                gender,
            })
        }
    };

    Ok(SubmissionForm {
        prompt,
        image,
        goal,
    })
}

fn image_payload(file: UploadedFile) -> Result<ImagePayload, ValidationError> {
    let declared = file
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let mime_type = match declared {
        Some(ct) if ct == "image/jpg" => "image/jpeg".to_string(),
        Some(ct) => ct,
        None => file
            .file_name
            .as_deref()
            .and_then(ImagePayload::mime_type_for_extension)
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationError::UnsupportedImageType(
                    file.file_name.clone().unwrap_or_else(|| "unknown".to_string()),
                )
            })?,
    };

    if !ImagePayload::is_supported_mime_type(&mime_type) {
        return Err(ValidationError::UnsupportedImageType(mime_type));
    }

    Ok(ImagePayload::new(mime_type, file.bytes))
}

/// Blank means 0, like a number input that starts at its minimum.
fn parse_weight(field: &'static str, value: Option<&str>) -> Result<f64, ValidationError> {
    let value = value.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Ok(0.0);
    }

    let weight = value
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .ok_or_else(|| ValidationError::InvalidWeight {
            field,
            value: value.to_string(),
        })?;

    if weight < 0.0 {
        return Err(ValidationError::NegativeWeight { field });
    }

    Ok(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8, 0xff],
        }
    }

    #[test]
    fn test_goal_none_ignores_weight_fields() {
        let form = collect(RawForm {
            prompt: Some("How many calories?".to_string()),
            image: Some(jpeg("plate.jpg")),
            goal: Some("none".to_string()),
            weight: Some("-5".to_string()),
            target_weight: Some("abc".to_string()),
            gender: Some("robot".to_string()),
        })
        .unwrap();

        assert_eq!(form.prompt, "How many calories?");
        assert_eq!(form.image.unwrap().mime_type, "image/jpeg");
        assert!(form.goal.is_none());
    }

    #[test]
    fn test_goal_with_details() {
        let form = collect(RawForm {
            prompt: Some("Is this ok?".to_string()),
            image: Some(jpeg("plate.jpg")),
            goal: Some("gain".to_string()),
            weight: Some("61.5".to_string()),
            target_weight: Some("70".to_string()),
            gender: Some("female".to_string()),
        })
        .unwrap();

        let goal = form.goal.unwrap();
        assert_eq!(goal.direction, GoalDirection::Gain);
        assert_eq!(goal.current_weight_kg, 61.5);
        assert_eq!(goal.target_weight_kg, 70.0);
        assert_eq!(goal.gender, Gender::Female);
    }

    #[test]
    fn test_goal_defaults_for_blank_fields() {
        let form = collect(RawForm {
            goal: Some("loss".to_string()),
            weight: Some("".to_string()),
            ..Default::default()
        })
        .unwrap();

        let goal = form.goal.unwrap();
        assert_eq!(goal.current_weight_kg, 0.0);
        assert_eq!(goal.target_weight_kg, 0.0);
        assert_eq!(goal.gender, Gender::Male);
    }

    #[test]
    fn test_missing_prompt_and_image_are_collected() {
        let form = collect(RawForm::default()).unwrap();
        assert!(form.prompt.is_empty());
        assert!(form.image.is_none());
        assert!(form.goal.is_none());

        // An empty file input counts as no upload.
        let form = collect(RawForm {
            image: Some(UploadedFile::default()),
            ..Default::default()
        })
        .unwrap();
        assert!(form.image.is_none());
    }

    #[test]
    fn test_rejects_bad_weights() {
        let err = collect(RawForm {
            goal: Some("loss".to_string()),
            weight: Some("-1".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::NegativeWeight { field: "weight" });

        let err = collect(RawForm {
            goal: Some("loss".to_string()),
            target_weight: Some("seventy".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeight { field: "target weight", .. }));
    }

    #[test]
    fn test_rejects_unknown_selections() {
        let err = collect(RawForm {
            goal: Some("maintain".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownGoal("maintain".to_string()));

        let err = collect(RawForm {
            goal: Some("gain".to_string()),
            gender: Some("other".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownGender("other".to_string()));
    }

    #[test]
    fn test_image_type_detection() {
        let form = collect(RawForm {
            image: Some(UploadedFile {
                file_name: Some("salad.WEBP".to_string()),
                content_type: Some("application/octet-stream".to_string()),
                bytes: vec![1],
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(form.image.unwrap().mime_type, "image/webp");

        let form = collect(RawForm {
            image: Some(UploadedFile {
                file_name: None,
                content_type: Some("image/jpg".to_string()),
                bytes: vec![1],
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(form.image.unwrap().mime_type, "image/jpeg");

        let err = collect(RawForm {
            image: Some(UploadedFile {
                file_name: Some("anim.gif".to_string()),
                content_type: Some("image/gif".to_string()),
                bytes: vec![1],
            }),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedImageType("image/gif".to_string()));
    }
}
