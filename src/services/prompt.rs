//! Instructions sent to the vision model.

/// Per-call instruction when every image is analyzed together.
pub const COMBINED_INSTRUCTION: &str =
    "Analyze the provided fashion product image(s) and return the analysis in the specified JSON format.";

/// Per-call instruction in per-image mode.
pub const SINGLE_IMAGE_INSTRUCTION: &str =
    "Analyze this fashion product image and return the analysis in the specified JSON format.";

/// System instruction describing the expected JSON document.
pub const PRODUCT_ANALYSIS_SYSTEM_PROMPT: &str = r#"
Analyze the provided image of a fashion product. Identify as much information as possible about the product, aiming to populate the fields of the following catalog tables. Return your findings as a single JSON object whose keys are the table names and whose values are arrays of objects representing candidate rows.

Target tables and fields:

* products (infer from the image):
    * name: a descriptive product name.
    * product_type: e.g. "Top", "Bottom", "Dress", "Shoe", "Bag".
    * category: e.g. "Clothing", "Footwear", "Accessories".
    * subcategory: e.g. "T-shirt", "Jeans", "Sandals", "Tote Bag".
    * gender: one of "Female", "Male", "Unisex", "Kids".
    * target_age_group: one of "Adult", "Teen", "Child", "Infant".
    * description: a brief description of the key features.
    * tags: a comma-separated list of search keywords.
* brands (only if clearly visible or recognizable):
    * name
* collections (only if the product belongs to a recognizable collection):
    * name
* colors (every visible color):
    * name: e.g. "Red", "Navy Blue", "Black", "Multicolor".
* sizes (only if size information is visible, e.g. on a tag):
    * name: e.g. "S", "M", "US 6", "EU 38".
* attributes (observable features):
    * name: e.g. "Neckline", "Sleeve Length", "Material", "Pattern", "Closure Type", "Fit", "Occasion".
    * value: e.g. "V-Neck", "Long Sleeves", "Cotton", "Striped", "Zipper", "Relaxed", "Casual".

Every object carries a confidence_score between 0.00 and 1.00. Omit fields you cannot identify.

Output format:

```json
{
  "products": [
    {"name": "Elegant Sleeveless Evening Gown", "confidence_score": 0.75},
    {"product_type": "Dress", "confidence_score": 0.98},
    {"category": "Clothing", "confidence_score": 0.99},
    {"subcategory": "Evening Dress", "confidence_score": 0.85},
    {"gender": "Female", "confidence_score": 0.97},
    {"target_age_group": "Adult", "confidence_score": 0.92},
    {"description": "A floor-length sleeveless evening gown with a sweetheart neckline and sequin embellishments.", "confidence_score": 0.70},
    {"tags": "evening gown, formal, sleeveless, sequin, elegant", "confidence_score": 0.80}
  ],
  "brands": [{"name": "Luxury Designs", "confidence_score": 0.55}],
  "collections": [],
  "colors": [
    {"name": "Silver", "confidence_score": 0.96},
    {"name": "Gray", "confidence_score": 0.88}
  ],
  "sizes": [{"name": "US 10", "confidence_score": 0.60}],
  "attributes": [
    {"name": "Neckline", "value": "Sweetheart", "confidence_score": 0.94},
    {"name": "Sleeve Length", "value": "Sleeveless", "confidence_score": 0.99},
    {"name": "Material", "value": "Polyester", "confidence_score": 0.80}
  ]
}
```

Respond with valid JSON only.
"#;
