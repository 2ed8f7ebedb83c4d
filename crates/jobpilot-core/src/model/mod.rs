//! Domain models exchanged with the backend.

mod dictionary;
mod filters;
mod resume;
mod vacancy;

pub use dictionary::{Area, Dictionaries, DictionaryItem, RUSSIA_AREA_ID, flatten_country_areas};
pub use filters::SearchFilters;
pub use resume::Resume;
pub use vacancy::{
    AnalysisResponse, LetterResponse, NamedRef, PostingAge, Salary, ScoreBand, SearchResponse,
    Snippet, Vacancy, VacancyDetail, VacancyEnrichment, VacancySummary,
};
