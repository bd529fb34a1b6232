// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateProfile, EmploymentType, ExperienceAggregation, ExperienceBands, ExperienceLevel,
    JobMatch, JobPosting, MatchingWeights, NamedSkillExperience, NewJobPosting, PostingId,
    Proficiency, ProfileId, ProfileRules, ProfileStatus, SalaryRange, Skill, SkillCategory,
    SkillExperience, SkillId,
};
pub use requests::{
    IngestPostingsRequest, IngestResumeRequest, MatchesQuery, NormalizeQuery,
    RecategorizeSkillRequest, RegisterSkillRequest,
};
pub use responses::{
    ErrorResponse, HealthResponse, IngestPostingsResponse, MatchesResponse, PostingIdsResponse,
    ProfileStatusResponse,
};
