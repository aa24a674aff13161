//! Download File Use Case
//!
//! Entitlement check, then open the attachment in blob storage. The caller
//! streams the reader; nothing is buffered here.

use std::sync::Arc;

use kernel::id::LessonFileId;
use kernel::identity::RequestIdentity;

use crate::application::check_access::CheckAccessUseCase;
use crate::domain::entity::lesson::LessonFile;
use crate::domain::repository::{CourseRepository, LearnerRepository};
use crate::domain::storage::{BlobObject, BlobStore};
use crate::error::{AcademyError, AcademyResult};

#[derive(Debug)]
pub struct FileDownload {
    pub file: LessonFile,
    pub blob: BlobObject,
}

pub struct DownloadFileUseCase<L, C, B>
where
    L: LearnerRepository,
    C: CourseRepository,
    B: BlobStore,
{
    access: CheckAccessUseCase<L, C>,
    course_repo: Arc<C>,
    blob_store: Arc<B>,
}

impl<L, C, B> DownloadFileUseCase<L, C, B>
where
    L: LearnerRepository,
    C: CourseRepository,
    B: BlobStore,
{
    pub fn new(learner_repo: Arc<L>, course_repo: Arc<C>, blob_store: Arc<B>) -> Self {
        Self {
            access: CheckAccessUseCase::new(learner_repo, course_repo.clone()),
            course_repo,
            blob_store,
        }
    }

    pub async fn open(&self, identity: RequestIdentity, file_id: &str) -> AcademyResult<FileDownload> {
        let file_id = LessonFileId::parse(file_id).ok_or(AcademyError::FileNotFound)?;
        if identity.user_id().is_none() {
            return Err(AcademyError::NotAuthenticated);
        }

        let (course_id, file) = self
            .course_repo
            .find_file(&file_id)
            .await?
            .ok_or(AcademyError::FileNotFound)?;

        let entitled = self
            .access
            .require_lesson(identity, course_id, file.lesson_id)
            .await?;

        let blob = self.blob_store.open(&file.storage_key).await?;

        if i64::try_from(blob.size).ok() != Some(file.size_bytes) {
            tracing::warn!(
                file_id = %file_id,
                recorded = file.size_bytes,
                actual = blob.size,
                "Stored file size differs from catalog"
            );
        }

        tracing::info!(
            user_id = %entitled.learner.user_id,
            course_id = %course_id,
            file_id = %file_id,
            "File download started"
        );

        Ok(FileDownload { file, blob })
    }
}
